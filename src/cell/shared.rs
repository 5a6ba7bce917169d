//! SharedRef & ArcCell - atomic shared pointer via double-word CAS
//!
//! Naive "clone lalu swap" punya race klasik: reader bisa meng-increment
//! refcount yang baru saja di-free oleh writer. Di sini store/load memakai
//! critical section dua fase yang ditandai sentinel BUSY: selama cell
//! memegang BUSY, tidak ada thread lain yang bisa mengambil reference baru
//! ke pair yang sedang digeser, sehingga manipulasi refcount-nya aman.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{fence, Ordering};

use portable_atomic::AtomicU128;

use super::control::{ControlBlock, DestroyFn};

/// Sentinel pair: control = 1, data = 0. Bukan pointer valid; tidak pernah
/// terlihat dari luar via load yang sukses.
const BUSY: u128 = 1;

/// Pack pair ke satu nilai 128-bit: low 64 bit = control block,
/// high 64 bit = data
#[inline(always)]
fn pack(control: *mut ControlBlock, data: *mut c_void) -> u128 {
    ((data as u64 as u128) << 64) | (control as u64 as u128)
}

/// Strong reference lokal ke shared value, atau null
///
/// Move-only: `clone` dan `drop` adalah operasi refcount eksplisit, dan
/// `drop` mengambil `self` by value sehingga double-drop lewat satu handle
/// tidak bisa ditulis. Null adalah nilai kelas satu: semua operasi
/// menanganinya.
pub struct SharedRef<T> {
    control: *mut ControlBlock,
    data: *mut T,
}

// SAFETY: SharedRef berperilaku seperti Arc<T>. Handle boleh pindah dan
// di-share antar thread karena refcount-nya interlocked; bound sama
// dengan std::sync::Arc.
unsafe impl<T: Send + Sync> Send for SharedRef<T> {}
unsafe impl<T: Send + Sync> Sync for SharedRef<T> {}

impl<T> SharedRef<T> {
    /// Reference null
    pub const fn null() -> Self {
        Self {
            control: ptr::null_mut(),
            data: ptr::null_mut(),
        }
    }

    /// Bentuk pair dari control block yang SUDAH terinisialisasi.
    /// Refcount tidak disentuh; kepemilikan satu reference pindah ke hasil.
    #[inline(always)]
    pub fn from_parts(data: *mut T, control: *mut ControlBlock) -> Self {
        Self { control, data }
    }

    /// Inisialisasi shared value baru
    ///
    /// Menulis control block segar (refcount = 1) melalui pointer yang
    /// dialokasikan caller, lalu membentuk pair. `destroy(context, data,
    /// control)` akan dipanggil tepat sekali saat reference terakhir
    /// di-drop dan harus membebaskan kedua alokasi.
    ///
    /// # Safety
    /// - `control_block` harus valid untuk write dan tetap hidup sampai
    ///   destructor dipanggil
    /// - `data` (jika non-null) harus tetap valid selama masih ada
    ///   reference yang hidup
    /// - `destroy` harus cocok dengan cara kedua alokasi dibuat
    pub unsafe fn new(
        data: *mut T,
        destroy_context: *mut c_void,
        destroy: DestroyFn,
        control_block: *mut ControlBlock,
    ) -> Self {
        control_block.write(ControlBlock::new(1, destroy_context, destroy));
        Self::from_parts(data, control_block)
    }

    /// True jika reference ini null
    #[inline(always)]
    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// Pointer ke data (null jika reference null)
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut T {
        self.data
    }

    /// Identity comparison: dua reference sama jika menunjuk control block
    /// yang sama
    #[inline(always)]
    pub fn is_equal(&self, other: &SharedRef<T>) -> bool {
        self.control == other.control
    }

    /// Strong reference kedua: increment refcount (kecuali null) lalu
    /// salin pair
    #[allow(clippy::should_implement_trait)]
    pub fn clone(&self) -> SharedRef<T> {
        if !self.data.is_null() {
            // SAFETY: refcount >= 1 selama self hidup, control block valid
            unsafe {
                (*self.control).refcount.fetch_add(1, Ordering::Relaxed);
            }
        }

        SharedRef {
            control: self.control,
            data: self.data,
        }
    }

    /// Drop reference ini; returns refcount SEBELUM decrement (0 untuk
    /// null). Saat hasilnya 1, destructor caller dipanggil tepat sekali.
    #[allow(clippy::should_implement_trait)]
    pub fn drop(self) -> i32 {
        let refcount = self.drop_reference();
        self.drop_data(refcount);
        refcount
    }

    /// Decrement refcount saja; returns nilai sebelum decrement
    /// (0 untuk null, tanpa decrement)
    #[inline(always)]
    fn drop_reference(&self) -> i32 {
        if self.data.is_null() {
            return 0;
        }

        // SAFETY: caller masih memegang satu reference, control block valid
        unsafe { (*self.control).refcount.fetch_sub(1, Ordering::Release) }
    }

    /// Jalankan destructor jika decrement tadi menghabiskan reference
    /// terakhir
    #[inline(always)]
    fn drop_data(&self, refcount: i32) {
        if refcount == 1 {
            // Sinkronisasi dengan semua Release decrement sebelum destroy
            fence(Ordering::Acquire);

            // SAFETY: kita pemegang reference terakhir; tidak ada observer
            // lain yang bisa mencapai data maupun control block
            unsafe {
                let destroy = (*self.control).destroy;
                let context = (*self.control).destroy_context;
                destroy(context, self.data as *mut c_void, self.control);
            }
        }
    }

    #[inline(always)]
    fn to_pair(&self) -> u128 {
        pack(self.control, self.data as *mut c_void)
    }

    #[inline(always)]
    fn from_pair(pair: u128) -> Self {
        Self {
            control: pair as u64 as *mut ControlBlock,
            data: (pair >> 64) as u64 as *mut T,
        }
    }
}

impl<T> PartialEq for SharedRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

impl<T> Eq for SharedRef<T> {}

/// Cell shared yang memegang satu reference, diganti atomik sebagai satu
/// nilai 128-bit
///
/// Cell memiliki satu strong reference atas isinya. `store` mengganti isi
/// dengan accounting yang benar; `load` memberi clone yang wajib di-drop
/// caller. Semua store dan load pada satu cell di-serialize oleh sentinel
/// BUSY.
pub struct ArcCell<T> {
    pair: AtomicU128,
    _marker: PhantomData<*mut T>,
}

// SAFETY: isi cell hanya diakses lewat 128-bit CAS; bound mengikuti
// SharedRef (= Arc<T>).
unsafe impl<T: Send + Sync> Send for ArcCell<T> {}
unsafe impl<T: Send + Sync> Sync for ArcCell<T> {}

impl<T> ArcCell<T> {
    /// Cell null; const sehingga bisa hidup di static
    pub const fn new() -> Self {
        Self {
            pair: AtomicU128::new(0),
            _marker: PhantomData,
        }
    }

    /// Acquire phase: CAS isi sekarang -> BUSY. Retry selama cell sedang
    /// BUSY atau CAS kalah dari writer lain. Saat sukses, caller memegang
    /// pair lama eksklusif: tidak ada thread lain yang bisa load atau
    /// meng-increment refcount-nya.
    #[inline]
    fn begin(&self) -> SharedRef<T> {
        loop {
            let old = self.pair.load(Ordering::Acquire);
            if old == BUSY {
                std::hint::spin_loop();
                continue;
            }

            match self
                .pair
                .compare_exchange_weak(old, BUSY, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return SharedRef::from_pair(old),
                Err(_) => std::hint::spin_loop(),
            }
        }
    }

    /// Release phase: publikasikan pair menggantikan BUSY
    #[inline]
    fn commit(&self, value: &SharedRef<T>) {
        let committed = self
            .pair
            .compare_exchange(BUSY, value.to_pair(), Ordering::AcqRel, Ordering::Relaxed)
            .is_ok();
        debug_assert!(committed, "commit without holding BUSY");
    }

    /// Atomic store dengan accounting refcount yang benar
    ///
    /// Nilai lama di-discount dan dihancurkan jika cell adalah pemegang
    /// terakhirnya. Menyimpan null adalah cara menguras cell.
    pub fn store(&self, value: &SharedRef<T>) {
        // Pre-bump untuk reference milik cell
        let fresh = value.clone();
        // Cabut nilai lama dari visibility
        let old = self.begin();
        // Discount reference milik cell atas nilai lama
        let old_refcount = old.drop_reference();
        // Publikasikan pair baru; kepemilikan fresh pindah ke cell
        self.commit(&fresh);
        // Baru sekarang aman menghancurkan nilai lama bila tidak ada
        // observer tersisa
        old.drop_data(old_refcount);
    }

    /// Atomic load: clone dari isi cell saat ini; caller wajib men-drop
    /// hasilnya
    pub fn load(&self) -> SharedRef<T> {
        let old = self.begin();
        let result = old.clone();
        // Kembalikan pair tanpa perubahan
        self.commit(&old);
        result
    }

    /// Exchange polos tanpa menyentuh refcount: kepemilikan satu reference
    /// masuk, kepemilikan reference yang tergeser keluar
    pub fn swap(&self, value: SharedRef<T>) -> SharedRef<T> {
        loop {
            let old = self.pair.load(Ordering::Acquire);
            if old == BUSY {
                // Jangan mencuri sentinel milik store/load yang sedang jalan
                std::hint::spin_loop();
                continue;
            }

            match self
                .pair
                .compare_exchange_weak(old, value.to_pair(), Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return SharedRef::from_pair(old),
                Err(_) => std::hint::spin_loop(),
            }
        }
    }
}

impl<T> Default for ArcCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::MaybeUninit;
    use std::sync::atomic::AtomicU32;

    struct Payload {
        x: i32,
        y: i32,
    }

    unsafe fn destroy_payload(context: *mut c_void, data: *mut c_void, control: *mut ControlBlock) {
        drop(Box::from_raw(data.cast::<Payload>()));
        drop(Box::from_raw(control.cast::<MaybeUninit<ControlBlock>>()));
        (*context.cast::<AtomicU32>()).fetch_add(1, Ordering::SeqCst);
    }

    /// Alokasi di sisi "caller": data + control block dari heap, destructor
    /// membebaskan keduanya dan menghitung panggilan lewat context
    fn make_payload(x: i32, y: i32, destroyed: &AtomicU32) -> SharedRef<Payload> {
        let data = Box::into_raw(Box::new(Payload { x, y }));
        let control =
            Box::into_raw(Box::new(MaybeUninit::<ControlBlock>::uninit())).cast::<ControlBlock>();

        unsafe {
            SharedRef::new(
                data,
                destroyed as *const AtomicU32 as *mut c_void,
                destroy_payload,
                control,
            )
        }
    }

    #[test]
    fn test_new_then_drop_destroys_once() {
        let destroyed = AtomicU32::new(0);
        let foo = make_payload(1, 2, &destroyed);

        assert!(!foo.is_null());
        assert_eq!(foo.drop(), 1);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clone_defers_destruction() {
        let destroyed = AtomicU32::new(0);
        let foo = make_payload(3, 4, &destroyed);
        let bar = foo.clone();

        assert!(foo.is_equal(&bar));
        assert_eq!(foo.drop(), 2);
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);

        assert_eq!(bar.drop(), 1);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_null_is_first_class() {
        let null: SharedRef<Payload> = SharedRef::null();

        assert!(null.is_null());
        assert!(null.clone().is_null());
        assert_eq!(null.drop(), 0);
    }

    #[test]
    fn test_identity_equality() {
        let destroyed = AtomicU32::new(0);
        let a = make_payload(1, 1, &destroyed);
        let b = make_payload(1, 1, &destroyed);
        let a2 = a.clone();

        // Identity, bukan structural: payload sama bukan berarti equal
        assert!(a == a2);
        assert!(a != b);

        a2.drop();
        a.drop();
        b.drop();
        assert_eq!(destroyed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_store_then_load_roundtrip() {
        let destroyed = AtomicU32::new(0);
        let cell: ArcCell<Payload> = ArcCell::new();
        let foo = make_payload(7, 8, &destroyed);

        cell.store(&foo);
        let loaded = cell.load();

        assert!(loaded.is_equal(&foo));
        unsafe {
            assert_eq!((*loaded.as_ptr()).x, 7);
            assert_eq!((*loaded.as_ptr()).y, 8);
        }

        loaded.drop();
        foo.drop();
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);

        // Menguras cell menghancurkan pemegang terakhir
        cell.store(&SharedRef::null());
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_store_displaces_previous_value() {
        let destroyed = AtomicU32::new(0);
        let cell: ArcCell<Payload> = ArcCell::new();

        let first = make_payload(1, 0, &destroyed);
        cell.store(&first);
        first.drop();
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);

        let second = make_payload(2, 0, &destroyed);
        cell.store(&second);
        // Nilai pertama tergeser dan tidak punya observer lain
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);

        second.drop();
        cell.store(&SharedRef::null());
        assert_eq!(destroyed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_swap_moves_ownership_without_refcount() {
        let destroyed = AtomicU32::new(0);
        let cell: ArcCell<Payload> = ArcCell::new();

        let foo = make_payload(5, 6, &destroyed);
        let previous = cell.swap(foo);
        assert!(previous.is_null());

        let taken = cell.swap(SharedRef::null());
        assert!(!taken.is_null());
        assert_eq!(taken.drop(), 1);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cell_usable_after_load() {
        let destroyed = AtomicU32::new(0);
        let cell: ArcCell<Payload> = ArcCell::new();
        let foo = make_payload(9, 9, &destroyed);
        cell.store(&foo);

        // Load mengembalikan pair; cell tidak boleh tertinggal BUSY
        let a = cell.load();
        let b = cell.load();
        assert!(a.is_equal(&b));

        a.drop();
        b.drop();
        foo.drop();
        cell.store(&SharedRef::null());
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }
}

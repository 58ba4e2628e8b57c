// Byte-order reversal of fixed-width elements.

/// Reverse the bytes of every `element_size`-wide element of `data`, in place.
///
/// `data.len()` must be a multiple of `element_size`; trailing bytes that do
/// not form a whole element are left alone. Single-byte elements are a no-op.
pub fn swap_elements(data: &mut [u8], element_size: usize) {
    debug_assert!(element_size == 0 || data.len() % element_size == 0);
    match element_size {
        0 | 1 => {}
        2 => {
            for e in data.chunks_exact_mut(2) {
                e.swap(0, 1);
            }
        }
        4 => {
            for e in data.chunks_exact_mut(4) {
                let v = u32::from_ne_bytes([e[0], e[1], e[2], e[3]]);
                e.copy_from_slice(&v.swap_bytes().to_ne_bytes());
            }
        }
        8 => {
            for e in data.chunks_exact_mut(8) {
                let mut b = [0u8; 8];
                b.copy_from_slice(e);
                let v = u64::from_ne_bytes(b);
                e.copy_from_slice(&v.swap_bytes().to_ne_bytes());
            }
        }
        n => {
            for e in data.chunks_exact_mut(n) {
                e.reverse();
            }
        }
    }
}

/// Copy `src` into `dest` reversing the byte order of each element.
pub fn swap_copy(dest: &mut [u8], src: &[u8], element_size: usize) {
    dest.copy_from_slice(src);
    swap_elements(dest, element_size);
}

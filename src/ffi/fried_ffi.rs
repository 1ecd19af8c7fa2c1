// C ABI entry points for the FRIED codec
use std::os::raw::c_char;
use std::ptr;
use std::slice;

use crate::codec::decoder::decode;
use crate::codec::encoder::{EncodeFlags, EncodeParams, encode};
use log::warn;

static FILE_VERSION: &[u8] = b"FRIED002\0";

/// Hands a buffer to the caller. It must come back through [`fried_free`]
/// with the same size.
fn into_raw(bytes: Vec<u8>) -> (*mut u8, i32) {
    let len = bytes.len() as i32;
    let boxed: Box<[u8]> = bytes.into_boxed_slice();
    (Box::into_raw(boxed) as *mut u8, len)
}

/// Returns the NUL-terminated stream tag, valid for the life of the process.
#[unsafe(no_mangle)]
pub extern "C" fn fried_supported_file_version() -> *const c_char {
    FILE_VERSION.as_ptr() as *const c_char
}

/// Encodes `xsize` × `ysize` pixels. Color input is BGRA, grayscale input
/// (flag bit 0) is (gray, alpha) pairs; flag bit 1 keeps alpha.
///
/// Returns null on failure. On success `out_size` receives the stream length.
///
/// # Safety
/// `image` must point to a full pixel buffer for the given size and flags,
/// and `out_size` must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fried_save(
    image: *const u8,
    xsize: i32,
    ysize: i32,
    flags: i32,
    quality: u8,
    out_size: *mut i32,
) -> *mut u8 {
    if image.is_null() || out_size.is_null() || xsize <= 0 || ysize <= 0 {
        return ptr::null_mut();
    }

    let flags = EncodeFlags::from_bits_truncate(flags as u32);
    let params = EncodeParams { flags, quality };
    let len = xsize as usize * ysize as usize * params.channel_setup().bytes_per_pixel();
    let pixels = unsafe { slice::from_raw_parts(image, len) };

    match encode(pixels, xsize as u32, ysize as u32, &params) {
        Ok(stream) => {
            let (data, size) = into_raw(stream);
            unsafe { *out_size = size };
            data
        }
        Err(e) => {
            warn!("fried_save failed: {e}");
            ptr::null_mut()
        }
    }
}

/// Decodes a stream. On success writes the dimensions, the pixel byte count
/// and an owned pixel buffer, and returns true. Pixels are BGRA for color
/// streams and (gray, alpha) pairs for gray ones.
///
/// # Safety
/// `data` must be readable for `size` bytes and every out pointer must be
/// valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fried_load(
    data: *const u8,
    size: i32,
    xout: *mut i32,
    yout: *mut i32,
    out_size: *mut i32,
    data_out: *mut *mut u8,
) -> bool {
    if data.is_null() || size < 0 || xout.is_null() || yout.is_null() || out_size.is_null() || data_out.is_null()
    {
        return false;
    }

    let input = unsafe { slice::from_raw_parts(data, size as usize) };
    match decode(input) {
        Ok(image) => {
            let (pixels, len) = into_raw(image.pixels);
            unsafe {
                *xout = image.width as i32;
                *yout = image.height as i32;
                *out_size = len;
                *data_out = pixels;
            }
            true
        }
        Err(e) => {
            warn!("fried_load failed: {e}");
            false
        }
    }
}

/// Releases a buffer returned by [`fried_save`] or [`fried_load`].
///
/// # Safety
/// `allocated` must be null or a pointer from this library together with
/// the size reported alongside it, and must not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fried_free(allocated: *mut u8, size: i32) {
    if allocated.is_null() || size < 0 {
        return;
    }
    unsafe {
        let slice = ptr::slice_from_raw_parts_mut(allocated, size as usize);
        drop(Box::from_raw(slice));
    }
}

//! Single-owner wrapper around one native codec context.

use crate::error::{CodecError, translate};
use crate::native::{NativeApi, NativeDecoder, NativeEncoder};
use std::ptr::NonNull;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Encoder {}
    impl Sealed for super::Decoder {}
}

/// The two kinds of native context and how to create and destroy them.
/// Implemented by [`Encoder`] and [`Decoder`] only.
///
/// ```compile_fail
/// use jpegls_native::handle::CodecKind;
/// use jpegls_native::native::NativeApi;
///
/// enum Custom {}
///
/// impl CodecKind for Custom {
///     type Raw = u8;
///     const NAME: &'static str = "custom";
///
///     fn create(_: &NativeApi) -> *mut u8 {
///         std::ptr::NonNull::dangling().as_ptr()
///     }
///
///     unsafe fn destroy(_: &NativeApi, _: *mut u8) {}
/// }
/// ```
pub trait CodecKind: sealed::Sealed {
    type Raw;
    const NAME: &'static str;

    fn create(api: &NativeApi) -> *mut Self::Raw;

    /// # Safety
    /// `raw` must come from [`CodecKind::create`] on the same `api` and must
    /// not be used afterwards.
    unsafe fn destroy(api: &NativeApi, raw: *mut Self::Raw);
}

/// Marker for encoder contexts.
#[derive(Debug)]
pub enum Encoder {}

/// Marker for decoder contexts.
#[derive(Debug)]
pub enum Decoder {}

impl CodecKind for Encoder {
    type Raw = NativeEncoder;
    const NAME: &'static str = "encoder";

    fn create(api: &NativeApi) -> *mut NativeEncoder {
        unsafe { (api.encoder_create)() }
    }

    unsafe fn destroy(api: &NativeApi, raw: *mut NativeEncoder) {
        unsafe { (api.encoder_destroy)(raw) }
    }
}

impl CodecKind for Decoder {
    type Raw = NativeDecoder;
    const NAME: &'static str = "decoder";

    fn create(api: &NativeApi) -> *mut NativeDecoder {
        unsafe { (api.decoder_create)() }
    }

    unsafe fn destroy(api: &NativeApi, raw: *mut NativeDecoder) {
        unsafe { (api.decoder_destroy)(raw) }
    }
}

/// Owns exactly one native context and destroys it exactly once, on
/// [`NativeCodecHandle::release`] or on drop, whichever comes first.
///
/// After a native call fails the context is considered poisoned: further
/// calls are rejected with [`CodecError::InvalidOperationOrder`] without
/// reaching the native codec.
pub struct NativeCodecHandle<K: CodecKind> {
    raw: Option<NonNull<K::Raw>>,
    api: &'static NativeApi,
    faulted: bool,
}

// The native context is not tied to the thread that created it. It is not
// `Sync`: every call mutates it.
unsafe impl<K: CodecKind> Send for NativeCodecHandle<K> {}

impl<K: CodecKind> NativeCodecHandle<K> {
    /// Creates a context on the process-wide native codec.
    pub fn create() -> Result<Self, CodecError> {
        Self::create_with(NativeApi::current())
    }

    /// Creates a context on a specific backend.
    ///
    /// ```compile_fail
    /// use jpegls_native::handle::{Encoder, NativeCodecHandle};
    /// use jpegls_native::native::NativeApi;
    ///
    /// let _ = NativeCodecHandle::<Encoder>::create_with(NativeApi::current());
    /// ```
    pub(crate) fn create_with(api: &'static NativeApi) -> Result<Self, CodecError> {
        let raw = NonNull::new(K::create(api)).ok_or(CodecError::OutOfResources)?;
        log::debug!("created native {} context ({})", K::NAME, api.name);
        Ok(Self {
            raw: Some(raw),
            api,
            faulted: false,
        })
    }

    pub fn is_open(&self) -> bool {
        self.raw.is_some()
    }

    /// Issues one native call and translates its result code.
    pub fn invoke(&mut self, operation: impl FnOnce(&NativeApi, *mut K::Raw) -> i32) -> Result<(), CodecError> {
        let raw = self
            .raw
            .ok_or(CodecError::InvalidOperationOrder("native context already released", None))?;
        if self.faulted {
            return Err(CodecError::InvalidOperationOrder("a previous native call failed", None));
        }

        let result = translate(operation(self.api, raw.as_ptr()));
        if let Err(error) = &result {
            log::debug!("native {} call failed: {error}", K::NAME);
            self.faulted = true;
        }
        result
    }

    /// Destroys the native context. Calling it again is a no-op.
    pub fn release(&mut self) {
        if let Some(raw) = self.raw.take() {
            unsafe { K::destroy(self.api, raw.as_ptr()) };
            log::debug!("released native {} context", K::NAME);
        }
    }
}

impl<K: CodecKind> Drop for NativeCodecHandle<K> {
    fn drop(&mut self) {
        self.release();
    }
}

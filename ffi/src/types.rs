//! `#[repr(C)]` types shared with the host runtime.
//!
//! Mirrors `include/reactor.h`.

use reactor_core::handles::Key;
use reactor_core::{EnvId, Error, ValueHandle as CoreValue};

/// Caller-owned bytes with an explicit length.
///
/// `ptr` is null exactly when the buffer is empty. Buffers handed out by
/// this library must be returned through `reactor_buffer_free`.
#[repr(C)]
#[derive(Debug)]
pub struct ByteBuffer {
    pub ptr: *mut u8,
    pub len: usize,
}

impl ByteBuffer {
    pub const EMPTY: ByteBuffer = ByteBuffer {
        ptr: core::ptr::null_mut(),
        len: 0,
    };

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            return Self::EMPTY;
        }
        let boxed = bytes.into_boxed_slice();
        let len = boxed.len();
        let ptr = Box::into_raw(boxed) as *mut u8;
        ByteBuffer { ptr, len }
    }

    pub fn from_error(err: &Error) -> Self {
        Self::from_vec(err.to_string().into_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.is_null()
    }

    /// Take ownership back from the host.
    ///
    /// # Safety
    ///
    /// The buffer must come from [`ByteBuffer::from_vec`] and must not have
    /// been freed already.
    pub unsafe fn into_vec(self) -> Vec<u8> {
        if self.ptr.is_null() {
            return Vec::new();
        }
        let slice = core::ptr::slice_from_raw_parts_mut(self.ptr, self.len);
        // SAFETY: produced by `Box::<[u8]>::into_raw` with this exact length.
        unsafe { Box::from_raw(slice) }.into_vec()
    }

    /// View the bytes without taking ownership.
    ///
    /// # Safety
    ///
    /// Same as [`ByteBuffer::into_vec`]; the view must not outlive the buffer.
    pub unsafe fn as_slice(&self) -> &[u8] {
        if self.ptr.is_null() {
            return &[];
        }
        // SAFETY: guaranteed by the caller.
        unsafe { core::slice::from_raw_parts(self.ptr, self.len) }
    }
}

/// Outcome of calls that produce no data.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    AlreadyInitialized = 1,
    NotInitialized = 2,
    InvalidEnvironment = 3,
    InvalidValue = 4,
    ForeignValue = 5,
    EngineFailure = 6,
    Panic = 7,
}

impl From<&Error> for Status {
    fn from(err: &Error) -> Self {
        match err {
            Error::AlreadyInitialized => Status::AlreadyInitialized,
            Error::NotInitialized => Status::NotInitialized,
            Error::ReleasedEnvironment => Status::InvalidEnvironment,
            Error::StaleValue => Status::InvalidValue,
            Error::ForeignValue { .. } => Status::ForeignValue,
            Error::Script(_)
            | Error::Spawn(_)
            | Error::EngineGone
            | Error::Api(_)
            | Error::Json(_) => Status::EngineFailure,
        }
    }
}

impl<T> From<Result<T, Error>> for Status {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(err) => Status::from(&err),
        }
    }
}

/// Slot in the process-wide environment table. Generation 0 is never
/// issued, so a zeroed handle is always invalid.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvHandle {
    pub index: u32,
    pub generation: u32,
}

impl EnvHandle {
    pub fn from_key(key: Key) -> Self {
        EnvHandle {
            index: key.index(),
            generation: key.generation(),
        }
    }

    pub fn key(self) -> Option<Key> {
        Key::from_parts(self.index, self.generation)
    }
}

/// A value produced by `reactor_eval`. `owner == 0` means "no value".
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueHandle {
    pub owner: u64,
    pub index: u32,
    pub generation: u32,
}

impl ValueHandle {
    pub const NONE: ValueHandle = ValueHandle {
        owner: 0,
        index: 0,
        generation: 0,
    };

    pub fn is_none(self) -> bool {
        self.owner == 0
    }

    pub fn from_core(value: CoreValue) -> Self {
        let key = value.key();
        ValueHandle {
            owner: value.owner().get(),
            index: key.index(),
            generation: key.generation(),
        }
    }

    pub fn to_core(self) -> Option<CoreValue> {
        let owner = EnvId::from_raw(self.owner)?;
        let key = Key::from_parts(self.index, self.generation)?;
        Some(CoreValue::from_parts(owner, key))
    }
}

/// Result of `reactor_eval`: exactly one field is populated.
#[repr(C)]
#[derive(Debug)]
pub struct EvalResult {
    pub value: ValueHandle,
    pub error: ByteBuffer,
}

impl EvalResult {
    pub fn value(value: ValueHandle) -> Self {
        EvalResult {
            value,
            error: ByteBuffer::EMPTY,
        }
    }

    pub fn error(message: impl Into<Vec<u8>>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = b"unknown error".to_vec();
        }
        EvalResult {
            value: ValueHandle::NONE,
            error: ByteBuffer::from_vec(message),
        }
    }
}

/// Result of `reactor_value_to_string`.
///
/// `string` may legitimately be empty, so success is "`error` is empty".
#[repr(C)]
#[derive(Debug)]
pub struct StringResult {
    pub string: ByteBuffer,
    pub error: ByteBuffer,
}

/// Engine build numbers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub build: i32,
    pub patch: i32,
}

impl From<reactor_core::Version> for Version {
    fn from(v: reactor_core::Version) -> Self {
        let clamp = |n: u32| i32::try_from(n).unwrap_or(i32::MAX);
        Version {
            major: clamp(v.major),
            minor: clamp(v.minor),
            build: clamp(v.build),
            patch: clamp(v.patch),
        }
    }
}

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use structbuf::{Pack, StructBuf};

use crate::att::ErrorCode;
use crate::util::name_of;
use crate::Uuid;

/// I/O callback result type.
pub type IoResult = std::result::Result<(), ErrorCode>;

/// Characteristic I/O callback. Every characteristic is bound to exactly one
/// callback, which dispatches on the characteristic UUID.
#[derive(Clone)]
#[repr(transparent)]
pub struct Io(Arc<dyn for<'a> Fn(IoReq<'a>) -> IoResult + Send + Sync>);

impl Io {
    /// Returns an I/O callback for a method of `T`.
    #[inline]
    pub fn with<T: Send + Sync + 'static>(
        this: &Arc<T>,
        f: impl Fn(&T, IoReq) -> IoResult + Send + Sync + 'static,
    ) -> Self {
        let this = Arc::clone(this);
        Self(Arc::new(move |req: IoReq| f(&this, req)))
    }

    /// Returns an I/O callback that routes requests to a [`Dispatch`]
    /// implementation.
    #[inline]
    pub fn dispatch<T: Dispatch>(this: &Arc<T>) -> Self {
        Self::with(this, |t, req| match req {
            IoReq::Read(r) => t.read(r),
            IoReq::Write(w) => t.write(w),
        })
    }

    /// Executes a request.
    #[inline(always)]
    pub(super) fn exec(&self, req: IoReq) -> IoResult {
        (self.0)(req)
    }
}

impl Debug for Io {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        (f.debug_tuple(name_of!(Io)).field(&Arc::as_ptr(&self.0))).finish()
    }
}

impl<T: Fn(IoReq) -> IoResult + Send + Sync + 'static> From<T> for Io {
    #[inline(always)]
    fn from(f: T) -> Self {
        Self(Arc::new(f))
    }
}

/// Access dispatcher for a group of characteristics. Implementations match
/// the request UUID and route it to exactly one handler. Operations that are
/// not overridden fail with [`ErrorCode::UnlikelyError`].
pub trait Dispatch: Send + Sync + 'static {
    /// Handles a characteristic read.
    fn read(&self, _: &mut ReadReq) -> IoResult {
        Err(ErrorCode::UnlikelyError)
    }

    /// Handles a characteristic write.
    fn write(&self, _: &WriteReq) -> IoResult {
        Err(ErrorCode::UnlikelyError)
    }
}

/// Characteristic I/O request.
#[derive(Debug)]
#[non_exhaustive]
pub enum IoReq<'a> {
    Read(&'a mut ReadReq),
    Write(&'a WriteReq<'a>),
}

impl IoReq<'_> {
    /// Returns the characteristic UUID.
    #[inline]
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        match *self {
            Self::Read(ref r) => r.uuid,
            Self::Write(w) => w.uuid,
        }
    }
}

/// Characteristic read request.
#[derive(Debug)]
pub struct ReadReq {
    uuid: Uuid,
    buf: StructBuf,
}

impl ReadReq {
    /// Maximum attribute value length ([Vol 3] Part F, Section 3.2.9).
    pub const MAX_LEN: usize = 512;

    /// Creates a new read request.
    #[inline]
    pub(super) const fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            buf: StructBuf::new(Self::MAX_LEN),
        }
    }

    /// Returns the attribute UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Provides the complete attribute value.
    #[inline]
    pub fn complete(&mut self, v: impl AsRef<[u8]>) -> IoResult {
        self.buf.clear();
        self.append(v)
    }

    /// Appends to the attribute value. Fails with
    /// [`ErrorCode::InsufficientResources`] if the value would exceed the
    /// maximum attribute length.
    pub fn append(&mut self, v: impl AsRef<[u8]>) -> IoResult {
        let v = v.as_ref();
        if self.buf.len() + v.len() > self.buf.lim() {
            return Err(ErrorCode::InsufficientResources);
        }
        self.buf.append().put(v);
        Ok(())
    }

    /// Returns the value accumulated so far.
    #[inline]
    #[must_use]
    pub fn value(&self) -> &[u8] {
        self.buf.as_ref()
    }
}

/// Characteristic write request.
#[derive(Debug)]
pub struct WriteReq<'a> {
    uuid: Uuid,
    val: &'a [u8],
}

impl<'a> WriteReq<'a> {
    /// Creates a new write request.
    #[inline]
    pub(super) const fn new(uuid: Uuid, val: &'a [u8]) -> Self {
        Self { uuid, val }
    }

    /// Returns the attribute UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the written value.
    #[inline(always)]
    #[must_use]
    pub const fn value(&self) -> &'a [u8] {
        self.val
    }
}

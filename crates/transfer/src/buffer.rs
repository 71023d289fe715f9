use crate::session::{Direction, TransferSession};
use crate::TransferError;

/// In-memory reassembly buffer for one upload.
///
/// Capacity is reserved up front from the declared size; writes are appended
/// at the current offset and any write that would pass the declared size is
/// rejected.
#[derive(Debug)]
pub struct UploadBuffer {
    data: Vec<u8>,
    session: TransferSession,
}

impl UploadBuffer {
    /// Reserves room for `declared_size` bytes.
    ///
    /// Fails if `declared_size` exceeds `limit` or the allocation fails.
    pub fn new(
        file_name: impl Into<String>,
        declared_size: u64,
        limit: u64,
    ) -> Result<Self, TransferError> {
        if declared_size > limit {
            return Err(TransferError::TooLarge {
                size: declared_size,
                limit,
            });
        }
        let capacity = usize::try_from(declared_size).map_err(|_| TransferError::TooLarge {
            size: declared_size,
            limit: usize::MAX as u64,
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;

        let mut session = TransferSession::new(file_name, Direction::Upload, declared_size);
        session.start();
        Ok(Self { data, session })
    }

    /// Appends `chunk` at the current offset.
    ///
    /// A chunk that would pass the declared size fails the session.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), TransferError> {
        if let Err(e) = self.session.advance(chunk.len() as u64) {
            self.session.fail(e.to_string());
            return Err(e);
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    /// Marks the upload as failed. Nothing written so far is kept.
    pub fn fail(&mut self, err: impl Into<String>) {
        self.session.fail(err);
        self.data = Vec::new();
    }

    pub fn is_complete(&self) -> bool {
        self.session.is_complete()
    }

    pub fn session(&self) -> &TransferSession {
        &self.session
    }

    /// Returns the reassembled bytes if every declared byte arrived.
    pub fn finish(mut self) -> Result<Vec<u8>, TransferError> {
        self.session.finish()?;
        Ok(self.data)
    }
}

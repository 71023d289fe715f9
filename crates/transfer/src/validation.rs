use crate::TransferError;

/// Longest accepted file name, in bytes.
const MAX_NAME_LEN: usize = 255;

/// Validates a store key sent by a peer.
///
/// Names are flat: the client always sends a base name, so separators,
/// `.`/`..`, NUL and empty names are rejected.
pub fn validate_file_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidName("empty name".into()));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(TransferError::InvalidName(format!(
            "name longer than {MAX_NAME_LEN} bytes"
        )));
    }

    if name == "." || name == ".." {
        return Err(TransferError::InvalidName(format!(
            "reserved name not allowed: {name}"
        )));
    }

    if name.contains(['/', '\\', '\0']) {
        return Err(TransferError::InvalidName(format!(
            "separator or NUL not allowed: {name:?}"
        )));
    }

    Ok(())
}

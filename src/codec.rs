use crate::error::LedgerError;

/// Width of a stored total on disk.
pub const TOTAL_LEN: usize = 4;

/// LMDB's compiled-in default key limit.
pub const MAX_VOUCHER_LEN: usize = 511;

pub fn encode_total(total: u32) -> [u8; TOTAL_LEN] {
    total.to_le_bytes()
}

pub fn decode_total(bytes: &[u8]) -> Result<u32, LedgerError> {
    let arr: [u8; TOTAL_LEN] = bytes.try_into().map_err(|_| {
        LedgerError::CorruptValue(format!("expected {} bytes, found {}", TOTAL_LEN, bytes.len()))
    })?;
    Ok(u32::from_le_bytes(arr))
}

pub fn check_voucher(voucher: &[u8]) -> Result<(), LedgerError> {
    if voucher.is_empty() {
        return Err(LedgerError::InvalidVoucher("empty voucher id".into()));
    }
    if voucher.len() > MAX_VOUCHER_LEN {
        return Err(LedgerError::InvalidVoucher(format!(
            "voucher id is {} bytes, limit is {}",
            voucher.len(),
            MAX_VOUCHER_LEN
        )));
    }
    Ok(())
}

/// Lossy printable form of a key for logs and error messages.
pub fn display_voucher(voucher: &[u8]) -> String {
    String::from_utf8_lossy(voucher).into_owned()
}

use crate::domain::RawSignature;
use crate::ports::ProviderError;

/// Lowercase hex of `value`, left-padded to an even number of digits.
pub fn even_hex(value: u64) -> String {
    let hex = format!("{value:x}");
    if hex.len() % 2 == 1 {
        format!("0{hex}")
    } else {
        hex
    }
}

fn bare_hex<'a>(part: &str, raw: &'a str) -> Result<&'a str, ProviderError> {
    let digits = raw.trim_start_matches("0x").trim_start_matches("0X");
    alloy::hex::decode(digits)
        .map_err(|e| ProviderError::Validation(format!("invalid signature {part}: {e}")))?;
    Ok(digits)
}

/// Concatenates r, s and v into a single `0x`-prefixed rsv signature.
pub fn assemble_rsv_signature(signature: &RawSignature) -> Result<String, ProviderError> {
    let r = bare_hex("r", &signature.r)?;
    let s = bare_hex("s", &signature.s)?;
    Ok(format!("0x{r}{s}{}", even_hex(signature.v)))
}

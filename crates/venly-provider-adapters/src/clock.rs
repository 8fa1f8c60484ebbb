use venly_provider_core::{ClockPort, ProviderError};

#[derive(Debug, Clone, Default)]
pub struct SystemClockAdapter;

impl ClockPort for SystemClockAdapter {
    fn now_ms(&self) -> Result<u64, ProviderError> {
        let now = web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .map_err(|e| ProviderError::Transport(format!("time error: {e}")))?;
        Ok(now.as_millis() as u64)
    }
}

pub mod formats;

use flexi_logger::{Logger, LoggerHandle};

use crate::Error;

/// Install the logger. Keep the handle alive for the life of the process.
pub fn init() -> Result<LoggerHandle, Error> {
    // stderr keeps stdout free for response payloads.
    let handle = Logger::try_with_env_or_str("info")?
        .format(formats::cli_format)
        .log_to_stderr()
        .start()?;

    Ok(handle)
}

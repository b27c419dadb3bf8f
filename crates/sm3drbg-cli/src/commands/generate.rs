use std::io::{ErrorKind, Write};
use std::path::Path;

use sm3drbg_core::{MAX_OUTPUT_BITS, Result, Sm3Drbg, bits_string};

pub struct GenerateCommandConfig<'a> {
    pub config_path: Option<&'a Path>,
    pub mode: Option<u8>,
    pub count: usize,
    pub format: &'a str,
    pub personalization: &'a [u8],
    pub additional: &'a [u8],
}

pub fn run(cmd: GenerateCommandConfig<'_>) -> Result<()> {
    let config = super::load_config(cmd.config_path, cmd.mode)?;
    let mut drbg = Sm3Drbg::init(config, cmd.personalization)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for _ in 0..cmd.count {
        let block = drbg.generate(MAX_OUTPUT_BITS, cmd.additional)?;
        let write_result = match cmd.format {
            "raw" => out.write_all(&block),
            "hex" => writeln!(out, "{}", super::hex(&block)),
            _ => writeln!(out, "{}", bits_string(&block)),
        };
        match write_result {
            Ok(()) => {}
            // Downstream closed the pipe.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
    match out.flush() {
        Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e.into()),
        _ => Ok(()),
    }
}

use sm3drbg_core::selftest::{expected_output, known_answer_output};
use sm3drbg_core::{DerivationVariant, DrbgError, Result};

pub fn run() -> Result<()> {
    let mut failed = false;
    for variant in [DerivationVariant::Accumulating, DerivationVariant::Standard] {
        let output = known_answer_output(variant)?;
        let expected = expected_output(variant);
        let pass = output.as_slice() == expected;
        println!(
            "{:<13} {}  {}",
            variant.to_string(),
            if pass { "PASS" } else { "FAIL" },
            super::hex(&output)
        );
        if !pass {
            println!("{:<13} want  {}", "", super::hex(expected));
            failed = true;
        }
    }
    if failed {
        return Err(DrbgError::SelfTestFailure);
    }
    Ok(())
}

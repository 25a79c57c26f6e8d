#![no_main]

use libfuzzer_sys::fuzz_target;
use thjson::{parse_slice, Listener, Result, Scalar};

/// Consumes every event so all emission paths run; the target only cares
/// that nothing panics.
#[derive(Default)]
struct Sink {
    depth: usize,
    scalars: usize,
}

impl Listener for Sink {
    fn begin_map(&mut self, _key: &str) -> Result<()> {
        self.depth += 1;
        Ok(())
    }

    fn end_map(&mut self) -> Result<()> {
        self.depth -= 1;
        Ok(())
    }

    fn property(&mut self, _key: &str, _value: Scalar<'_>) -> Result<()> {
        self.scalars += 1;
        Ok(())
    }

    fn value(&mut self, _value: Scalar<'_>) -> Result<()> {
        self.scalars += 1;
        Ok(())
    }

    fn function(&mut self, text: &str) -> Result<String> {
        // Feed a prefix of the call text back in so expansion paths fuzz too.
        Ok(text.chars().take(32).collect())
    }
}

fuzz_target!(|data: &[u8]| {
    let mut sink = Sink::default();
    let _ = parse_slice(data, &mut sink);
});

//! Shared fixture for interpreter tests: a VM whose `print` output is
//! captured in memory.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use karst_vm::{InterpretError, Vm, VmConfig};

/// A `Write` handle that appends into a shared buffer.
#[derive(Clone, Default)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().expect("output buffer lock");
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("output buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A VM plus the buffer its `print` statements write to.
pub struct VmFixture {
    pub vm: Vm,
    output: SharedOutput,
}

impl VmFixture {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let output = SharedOutput::default();
        let vm = Vm::with_output(config, Box::new(output.clone())).expect("config is valid");
        VmFixture { vm, output }
    }

    pub fn run(&mut self, source: &str) -> Result<(), InterpretError> {
        self.vm.interpret(source)
    }

    /// Interprets `source`, failing the test on any error.
    pub fn run_ok(&mut self, source: &str) {
        if let Err(e) = self.vm.interpret(source) {
            panic!("interpret failed:\n{}", e);
        }
    }

    /// Everything printed so far.
    pub fn output(&self) -> String {
        self.output.contents()
    }

    /// Printed lines, without trailing newlines.
    pub fn lines(&self) -> Vec<String> {
        self.output
            .contents()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Runs a program on a fresh default VM and returns its printed lines.
pub fn run_program(source: &str) -> Vec<String> {
    let mut fixture = VmFixture::new();
    fixture.run_ok(source);
    fixture.lines()
}

/// Runs a program expecting a runtime error; returns the error message
/// (first line, without the trace).
pub fn expect_runtime_error(source: &str) -> String {
    let mut fixture = VmFixture::new();
    match fixture.run(source) {
        Err(InterpretError::Runtime(e)) => e.message,
        Err(InterpretError::Compile(e)) => panic!("expected runtime error, got compile error:\n{}", e),
        Ok(()) => panic!("expected runtime error, program succeeded"),
    }
}

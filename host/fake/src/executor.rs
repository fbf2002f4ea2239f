// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A "fake" [Executor] implementation, which can respond to host requests.

use crate::FakeHost;

use async_trait::async_trait;
use host_exec::{
    log_input, log_output, BoxedExecutor, ExecutionError, Executor, Input,
    Output, OutputExt,
};
use slog::Logger;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Handler called when a fake command runs
type WaitFn = dyn FnMut(Input) -> Output + Send + Sync;
type BoxedWaitFn = Box<WaitFn>;

pub struct FakeExecutorBuilder {
    log: Logger,
    wait_handler: Option<BoxedWaitFn>,
}

impl FakeExecutorBuilder {
    pub fn new(log: Logger) -> Self {
        Self { log, wait_handler: None }
    }

    /// Convenience function to register the sequence with a [FakeExecutor].
    pub fn with_sequence(mut self, mut sequence: CommandSequence) -> Self {
        self.wait_handler = Some(Box::new(move |input| -> Output {
            sequence.execute(input)
        }));
        self
    }

    /// Routes every command to a simulated host.
    pub fn with_host(mut self, host: FakeHost) -> Self {
        self.wait_handler =
            Some(Box::new(move |input| -> Output { host.execute(input) }));
        self
    }

    pub fn build(self) -> Arc<FakeExecutor> {
        FakeExecutor::new(
            self.log,
            self.wait_handler
                .unwrap_or_else(|| Box::new(|_input| Output::success())),
        )
    }
}

/// An executor which can expect certain inputs, and respond with specific
/// outputs.
pub struct FakeExecutor {
    log: Logger,
    counter: AtomicU64,
    wait_handler: Mutex<BoxedWaitFn>,
}

impl FakeExecutor {
    pub fn new(log: Logger, w: BoxedWaitFn) -> Arc<FakeExecutor> {
        Arc::new(Self {
            log,
            counter: AtomicU64::new(0),
            wait_handler: Mutex::new(w),
        })
    }

    /// Perform some type coercion to access a commonly-used trait object.
    pub fn as_executor(self: Arc<Self>) -> BoxedExecutor {
        self
    }

    fn execute_internal(
        &self,
        command: &Command,
    ) -> Result<Output, ExecutionError> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        log_input(&self.log, id, command);

        let output = self.wait_handler.lock().unwrap()(Input::from(command));
        log_output(&self.log, id, &output);

        if !output.status.success() {
            return Err(ExecutionError::from_output(command, &output));
        }
        Ok(output)
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    // NOTE: We aren't actually performing any async operations -- it's up to
    // the caller to control the (synchronous) handlers.
    //
    // However, this still provides testability, while letting the "real
    // executor" make truly async calls while launching processes.
    async fn execute_async(
        &self,
        command: &mut tokio::process::Command,
    ) -> Result<Output, ExecutionError> {
        self.execute_internal(command.as_std())
    }
}

struct HandledCommand {
    input: Input,
    output: Output,
}

/// A handler that may be used for setting inputs/outputs to the executor
/// when these commands are known ahead-of-time.
///
/// See: [FakeExecutorBuilder::with_sequence] for integration with a
/// [FakeExecutor].
pub struct CommandSequence {
    expected: Vec<HandledCommand>,
    index: usize,
}

impl CommandSequence {
    pub fn new() -> Self {
        Self { expected: Vec::new(), index: 0 }
    }

    /// Expects a static "input" to exactly produce some "output".
    pub fn expect(&mut self, input: Input, output: Output) {
        self.expected.push(HandledCommand { input, output });
    }

    /// A helper for [Self::expect] which quietly succeeds.
    pub fn expect_ok<S: AsRef<str>>(&mut self, input: S) {
        self.expect(Input::shell(input), Output::success())
    }

    /// A helper for [Self::expect] which quietly fails.
    pub fn expect_fail<S: AsRef<str>>(&mut self, input: S) {
        self.expect(Input::shell(input), Output::failure())
    }

    fn execute(&mut self, observed_input: Input) -> Output {
        let expected = self
            .expected
            .get(self.index)
            .unwrap_or_else(|| panic!("Unexpected command: {observed_input}"));
        self.index += 1;

        assert_eq!(observed_input, expected.input, "Unexpected input command");
        expected.output.clone()
    }
}

impl Default for CommandSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CommandSequence {
    fn drop(&mut self) {
        let expected = self.expected.len();
        let actual = self.index;
        if actual < expected {
            let tip = &self.expected[actual].input;
            let errmsg = format!(
                "Only saw {actual} calls, expected {expected}\n\
                 Next would have been: {tip}"
            );
            if !std::thread::panicking() {
                panic!("{errmsg}");
            } else {
                eprintln!("{errmsg}");
            }
        }
    }
}

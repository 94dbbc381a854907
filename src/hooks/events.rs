use crate::function::arguments::Arguments;
use crate::function::metadata::FunctionMetadata;
use crate::function::result::FunctionResult;
use crate::function::types::FunctionError;

/// State shared with invoking-phase handlers, fired before a function runs.
///
/// Handlers run in registration order against the same event value. They may
/// edit `arguments` in place, swap them wholesale with
/// [`update_arguments`](Self::update_arguments), or request flow control.
#[derive(Debug)]
pub struct InvokingEvent {
    pub metadata: FunctionMetadata,
    pub arguments: Arguments,
    cancel: bool,
    skip: bool,
    updated_arguments: Option<Arguments>,
}

impl InvokingEvent {
    pub fn new(metadata: FunctionMetadata, arguments: Arguments) -> Self {
        Self {
            metadata,
            arguments,
            cancel: false,
            skip: false,
            updated_arguments: None,
        }
    }

    /// Requests that the pipeline stop before running this function.
    pub fn cancel(&mut self) {
        self.cancel = true;
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel
    }

    /// Requests that this function be skipped without producing a result.
    pub fn skip(&mut self) {
        self.skip = true;
    }

    pub fn skip_requested(&self) -> bool {
        self.skip
    }

    /// Replaces the working arguments for this and all subsequent steps.
    pub fn update_arguments(&mut self, arguments: Arguments) {
        self.updated_arguments = Some(arguments);
    }

    pub fn arguments_updated(&self) -> bool {
        self.updated_arguments.is_some()
    }

    /// Arguments the pipeline continues with: the wholesale replacement when
    /// one was provided, otherwise the (possibly edited) originals.
    pub fn into_arguments(self) -> Arguments {
        self.updated_arguments.unwrap_or(self.arguments)
    }
}

/// State shared with invoked-phase handlers, fired after a function ran or
/// faulted.
///
/// A fault arrives as `error`. Handlers may clear it (and optionally supply a
/// replacement `result`); an error still present after dispatch aborts the
/// whole pipeline.
#[derive(Debug)]
pub struct InvokedEvent {
    pub metadata: FunctionMetadata,
    pub arguments: Arguments,
    pub result: Option<FunctionResult>,
    pub error: Option<FunctionError>,
    cancel: bool,
    repeat: bool,
    updated_arguments: Option<Arguments>,
}

impl InvokedEvent {
    pub fn new(
        metadata: FunctionMetadata,
        arguments: Arguments,
        result: Option<FunctionResult>,
        error: Option<FunctionError>,
    ) -> Self {
        Self {
            metadata,
            arguments,
            result,
            error,
            cancel: false,
            repeat: false,
            updated_arguments: None,
        }
    }

    /// Requests that the pipeline stop after this function.
    pub fn cancel(&mut self) {
        self.cancel = true;
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel
    }

    /// Requests that this function run again with the current arguments.
    pub fn repeat(&mut self) {
        self.repeat = true;
    }

    pub fn repeat_requested(&self) -> bool {
        self.repeat
    }

    /// Replaces the working arguments for subsequent steps (and for the
    /// repeated run, when one was requested).
    pub fn update_arguments(&mut self, arguments: Arguments) {
        self.updated_arguments = Some(arguments);
    }

    pub fn arguments_updated(&self) -> bool {
        self.updated_arguments.is_some()
    }

    /// Decomposes into `(arguments, result, error)`, with any wholesale
    /// argument replacement applied.
    pub fn into_parts(self) -> (Arguments, Option<FunctionResult>, Option<FunctionError>) {
        let arguments = self.updated_arguments.unwrap_or(self.arguments);
        (arguments, self.result, self.error)
    }
}

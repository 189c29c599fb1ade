//! Engine thread backing one environment.
//!
//! An engine instance is bound to the thread it was created on (it records
//! that thread's stack bounds and stays entered there), so every environment
//! gets a dedicated OS thread that creates the instance, owns it for its
//! whole life and tears it down. Callers send [`Command`]s over a channel and
//! block on a per-command reply channel; the caller-side instance lock lives
//! in [`crate::api::environment`].

pub(crate) mod scope;

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use crate::api::options::EnvironmentOptions;
use crate::api::{EnvId, Error};
use crate::diagnostics::{self, Phase, ScriptError};
use crate::handles::{HandleTable, Key};
use crate::marshal;
use scope::IsolateScope;

/// Work items executed on an engine thread.
pub(crate) enum Command {
    Eval {
        code: Vec<u8>,
        filename: String,
        reply: Sender<Result<Key, ScriptError>>,
    },
    Stringify {
        key: Key,
        reply: Sender<Result<Vec<u8>, Error>>,
    },
    ReleaseValue {
        key: Key,
        reply: Sender<Result<(), Error>>,
    },
    LiveValues {
        reply: Sender<usize>,
    },
    Shutdown {
        reply: Sender<()>,
    },
}

/// Caller-side end of an engine thread.
pub(crate) struct EngineLink {
    commands: Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl EngineLink {
    /// Send a command built around a fresh reply channel and wait for the
    /// answer.
    pub fn request<T>(&self, build: impl FnOnce(Sender<T>) -> Command) -> Result<T, Error> {
        let (reply, answer) = mpsc::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| Error::EngineGone)?;
        answer.recv().map_err(|_| Error::EngineGone)
    }

    /// Tear the engine instance down and wait for its thread to exit.
    pub fn shutdown(mut self) -> Result<(), Error> {
        let result = self.request(|reply| Command::Shutdown { reply });
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("engine thread panicked during shutdown");
                return Err(Error::EngineGone);
            }
        }
        result
    }
}

/// Start an engine thread and wait until its instance and context exist.
pub(crate) fn spawn(id: EnvId, options: EnvironmentOptions) -> Result<EngineLink, Error> {
    let (commands, inbox) = mpsc::channel::<Command>();
    let (ready_tx, ready_rx) = mpsc::channel::<()>();

    let mut builder = std::thread::Builder::new().name(format!("reactor-env-{id}"));
    if let Some(size) = options.thread_stack_size {
        builder = builder.stack_size(size);
    }

    let thread = builder
        .spawn(move || {
            let mut core = EngineCore::new(&options);
            // The caller may have given up waiting; nothing to do then.
            let _ = ready_tx.send(());
            core.run(inbox);
        })
        .map_err(Error::Spawn)?;

    if ready_rx.recv().is_err() {
        // The thread died while creating the instance.
        let _ = thread.join();
        return Err(Error::EngineGone);
    }

    Ok(EngineLink {
        commands,
        thread: Some(thread),
    })
}

/// Engine-thread state. Field order matters: values and the context are
/// dropped before the instance that backs them.
struct EngineCore {
    values: HandleTable<v8::Global<v8::Value>>,
    context: Option<v8::Global<v8::Context>>,
    isolate: v8::OwnedIsolate,
}

impl EngineCore {
    fn new(options: &EnvironmentOptions) -> Self {
        let mut params = v8::CreateParams::default()
            .array_buffer_allocator(v8::new_default_allocator().make_shared());
        if let Some(limits) = options.heap_limits {
            params = params.heap_limits(limits.initial_bytes, limits.max_bytes);
        }

        let mut isolate = v8::Isolate::new(params);
        if let Some(frames) = options.stack_trace_limit {
            let frames = i32::try_from(frames).unwrap_or(i32::MAX);
            isolate.set_capture_stack_trace_for_uncaught_exceptions(true, frames);
        }

        let context = {
            let scope = &mut v8::HandleScope::new(&mut isolate);
            let context = v8::Context::new(scope, Default::default());
            v8::Global::new(scope, context)
        };

        Self {
            values: HandleTable::new(),
            context: Some(context),
            isolate,
        }
    }

    fn run(&mut self, inbox: Receiver<Command>) {
        while let Ok(command) = inbox.recv() {
            match command {
                Command::Eval {
                    code,
                    filename,
                    reply,
                } => {
                    let _ = reply.send(self.eval(&code, &filename));
                }
                Command::Stringify { key, reply } => {
                    let _ = reply.send(self.stringify(key));
                }
                Command::ReleaseValue { key, reply } => {
                    let _ = reply.send(self.release_value(key));
                }
                Command::LiveValues { reply } => {
                    let _ = reply.send(self.values.len());
                }
                Command::Shutdown { reply } => {
                    self.teardown();
                    let _ = reply.send(());
                    return;
                }
            }
        }
        // Every sender is gone without a shutdown request.
        self.teardown();
    }

    /// Split `self` into the value scope inputs and the value table.
    fn parts(
        &mut self,
    ) -> (
        IsolateScope<'_>,
        &v8::Global<v8::Context>,
        &mut HandleTable<v8::Global<v8::Value>>,
    ) {
        let EngineCore {
            values,
            context,
            isolate,
        } = self;
        let context = context
            .as_ref()
            .expect("commands are never served after teardown");
        (IsolateScope::enter(isolate), context, values)
    }

    fn eval(&mut self, code: &[u8], filename: &str) -> Result<Key, ScriptError> {
        let (mut isolate, context, values) = self.parts();
        isolate.with_values(context, |scope| {
            let try_catch = &mut v8::TryCatch::new(scope);
            try_catch.set_verbose(false);

            let Some(source) = marshal::new_string(try_catch, code) else {
                return Err(ScriptError::new(
                    Phase::Compile,
                    "RangeError: source exceeds the maximum string length".to_string(),
                    None,
                    None,
                ));
            };
            let resource = marshal::new_string(try_catch, filename.as_bytes())
                .unwrap_or_else(|| v8::String::empty(try_catch));
            let origin = v8::ScriptOrigin::new(
                try_catch,
                resource.into(),
                0,
                0,
                false,
                0,
                None,
                false,
                false,
                false,
                None,
            );

            let Some(script) = v8::Script::compile(try_catch, source, Some(&origin)) else {
                return Err(diagnostics::capture(try_catch, Phase::Compile));
            };
            let Some(result) = script.run(try_catch) else {
                return Err(diagnostics::capture(try_catch, Phase::Run));
            };

            let global = v8::Global::new(try_catch, result);
            Ok(values.insert(global))
        })
    }

    fn stringify(&mut self, key: Key) -> Result<Vec<u8>, Error> {
        let (mut isolate, context, values) = self.parts();
        isolate.with_values(context, |scope| {
            let global = values.get(key).ok_or(Error::StaleValue)?;
            let value = v8::Local::new(scope, global);
            marshal::stringify(scope, value).map_err(Error::Script)
        })
    }

    fn release_value(&mut self, key: Key) -> Result<(), Error> {
        let (mut isolate, context, values) = self.parts();
        isolate.with_values(context, |_scope| {
            // Dropping the global frees the engine-side reference.
            values.remove(key).map(drop).ok_or(Error::StaleValue)
        })
    }

    /// Reclaim outstanding values, drop the context, and leave the instance
    /// ready to be disposed when `self` drops.
    fn teardown(&mut self) {
        let mut isolate = IsolateScope::enter(&mut self.isolate);
        let leaked = self.values.drain();
        if !leaked.is_empty() {
            tracing::warn!(
                count = leaked.len(),
                "releasing environment with outstanding values; they are now invalid"
            );
        }
        drop(leaked);
        self.context = None;
        isolate.isolate().low_memory_notification();
    }
}

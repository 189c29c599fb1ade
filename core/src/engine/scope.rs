//! Scoped access to an engine instance.
//!
//! Access happens at three levels, acquired in a fixed order and released in
//! exactly the reverse order:
//!
//! 1. **Instance lock**: the per-environment mutex taken by the calling
//!    thread (see [`crate::api::environment`]). At most one caller talks to
//!    an engine instance at a time.
//! 2. **Isolate scope** ([`IsolateScope`]): exclusive `&mut` access to the
//!    instance on its engine thread, which entered it when it was created.
//!    Enough for instance-level work such as teardown.
//! 3. **Value scope** ([`IsolateScope::with_values`]): a handle scope for
//!    temporary engine handles, then entry into the environment's execution
//!    context. Required for anything that reads, writes or runs values.
//!
//! Levels 2 and 3 are lexical: the closure passed to `with_values` cannot
//! leak a temporary handle, and every exit path (including an engine fault
//! captured inside it) leaves the context and closes the handle scope.

/// Exclusive access to one engine instance on its engine thread.
pub(crate) struct IsolateScope<'i> {
    isolate: &'i mut v8::Isolate,
}

impl<'i> IsolateScope<'i> {
    pub fn enter(isolate: &'i mut v8::Isolate) -> Self {
        Self { isolate }
    }

    pub fn isolate(&mut self) -> &mut v8::Isolate {
        self.isolate
    }

    /// Open a handle scope, enter `context` and run `f` inside both.
    pub fn with_values<R>(
        &mut self,
        context: &v8::Global<v8::Context>,
        f: impl FnOnce(&mut v8::HandleScope) -> R,
    ) -> R {
        let handle_scope = &mut v8::HandleScope::new(&mut *self.isolate);
        let context = v8::Local::new(handle_scope, context);
        let context_scope = &mut v8::ContextScope::new(handle_scope, context);
        f(context_scope)
    }
}

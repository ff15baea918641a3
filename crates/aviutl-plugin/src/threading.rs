//! Work splitting over the host's thread pool.

use std::ffi::c_void;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use aviutl_sys::{Bool, MultiThreadFunc};

use crate::error::{PluginError, PluginResult};
use crate::ffi_guard::guard_void;

/// Worker closure: `(thread_id, thread_num)`.
pub type WorkerFn<'a> = dyn Fn(usize, usize) + Sync + 'a;

/// Something that can run a closure on `n` workers and wait for all of them.
pub trait Dispatcher {
    fn dispatch(&self, f: &WorkerFn<'_>) -> PluginResult<()>;
}

/// Runs every worker id in turn on the calling thread.
#[derive(Debug, Clone, Copy)]
pub struct Sequential {
    threads: usize,
}

impl Sequential {
    pub fn new(threads: usize) -> Self {
        Self { threads: threads.max(1) }
    }
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Dispatcher for Sequential {
    fn dispatch(&self, f: &WorkerFn<'_>) -> PluginResult<()> {
        for id in 0..self.threads {
            f(id, self.threads);
        }
        Ok(())
    }
}

/// Host entry point shared by `EXFUNC` and `COLOR_PLUGIN_INFO`.
pub(crate) type ExecMultiThread = unsafe extern "C" fn(func: MultiThreadFunc, param1: *mut c_void, param2: *mut c_void) -> Bool;

unsafe extern "C" fn worker_trampoline(thread_id: i32, thread_num: i32, param1: *mut c_void, param2: *mut c_void) {
    // SAFETY: `param1` is the `&&WorkerFn` and `param2` the `AtomicBool` passed by
    // `dispatch_via_host`, both alive for the whole call.
    let (f, panicked) = unsafe { (&*(param1 as *const &WorkerFn<'_>), &*(param2 as *const AtomicBool)) };
    if !guard_void("exec_multi_thread_func", || f(thread_id.max(0) as usize, thread_num.max(1) as usize)) {
        panicked.store(true, Ordering::Release);
    }
}

/// Hand `f` to a host `exec_multi_thread_func`. A panic in any worker fails
/// the whole dispatch.
pub(crate) fn dispatch_via_host(exec: Option<ExecMultiThread>, f: &WorkerFn<'_>) -> PluginResult<()> {
    let exec = exec.ok_or(PluginError::MissingCallback("exec_multi_thread_func"))?;
    let mut thin: &WorkerFn<'_> = f;
    let param = &mut thin as *mut &WorkerFn<'_> as *mut c_void;
    let panicked = AtomicBool::new(false);
    let flag = &panicked as *const AtomicBool as *mut c_void;
    // SAFETY: the host returns only after every worker has finished, so `thin`
    // and `panicked` outlive all uses.
    let ok = unsafe { exec(worker_trampoline, param, flag) };
    if panicked.load(Ordering::Acquire) {
        return Err(PluginError::WorkerPanicked("exec_multi_thread_func"));
    }
    if ok == 0 {
        return Err(PluginError::HostRejected("exec_multi_thread_func"));
    }
    Ok(())
}

/// A host thread pool detached from the structure that carried it, so the
/// structure's buffers can be borrowed mutably while dispatching.
#[derive(Clone, Copy)]
pub struct HostThreads {
    exec: Option<ExecMultiThread>,
}

impl HostThreads {
    pub(crate) fn new(exec: Option<ExecMultiThread>) -> Self {
        Self { exec }
    }

    pub fn is_available(&self) -> bool {
        self.exec.is_some()
    }
}

impl Dispatcher for HostThreads {
    fn dispatch(&self, f: &WorkerFn<'_>) -> PluginResult<()> {
        dispatch_via_host(self.exec, f)
    }
}

/// Contiguous share of `len` items for worker `id` of `num`.
///
/// Bands cover `0..len` exactly once, differ in size by at most one item, and
/// are empty for surplus workers.
pub fn band_range(len: usize, id: usize, num: usize) -> Range<usize> {
    let num = num.max(1);
    if id >= num {
        return len..len;
    }
    let start = len * id / num;
    let end = len * (id + 1) / num;
    start..end
}

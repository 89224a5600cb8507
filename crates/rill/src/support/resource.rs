//! resource wrapper

/// Owns a value of type `T` and runs a disposer closure on it exactly once,
/// when the `Resource` is dropped or explicitly [`reset`](Resource::reset).
///
/// Generalizes a non-RAII handle (a file descriptor, a native handle) paired
/// with a deleter closure. Most Rust types get this for free from `Drop`;
/// `Resource` exists for the handles that don't — an externally-owned
/// handle, or one whose disposal needs a capturing closure rather than a
/// plain `Drop` impl.
pub struct Resource<T, D: FnMut(T)> {
    value: Option<T>,
    dispose: D,
}

impl<T, D: FnMut(T)> Resource<T, D> {
    pub fn new(value: T, dispose: D) -> Self {
        Self {
            value: Some(value),
            dispose,
        }
    }

    pub fn get(&self) -> &T {
        self.value.as_ref().expect("resource already released")
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("resource already released")
    }

    /// True iff the resource has not yet been released or reset.
    pub fn is_held(&self) -> bool {
        self.value.is_some()
    }

    /// Take the value back out without running the disposer.
    pub fn release(mut self) -> T {
        self.value.take().expect("resource already released")
    }

    /// Run the disposer now, if the resource hasn't already been released.
    pub fn reset(&mut self) {
        if let Some(v) = self.value.take() {
            (self.dispose)(v);
        }
    }
}

impl<T, D: FnMut(T)> std::ops::Deref for Resource<T, D> {
    type Target = T;

    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T, D: FnMut(T)> std::ops::DerefMut for Resource<T, D> {
    fn deref_mut(&mut self) -> &mut T {
        self.get_mut()
    }
}

impl<T, D: FnMut(T)> Drop for Resource<T, D> {
    fn drop(&mut self) {
        self.reset();
    }
}

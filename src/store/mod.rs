use std::sync::{Arc, Mutex};

/// Field-by-field shallow merge of a partial record into a full one.
/// Fields absent from the patch leave the current value untouched.
pub trait Patch<T> {
    fn apply_to(self, value: &mut T);
}

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: T,
    next_id: u64,
    observers: Vec<(u64, Observer<T>)>,
}

/// Reactive value container shared between the launcher core and the UI.
///
/// `set` merges a patch under the lock, then calls every observer
/// synchronously, in registration order, with the fully merged snapshot.
/// Observers never see a partially applied value.
pub struct Store<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone> Store<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                value: initial,
                next_id: 0,
                observers: Vec::new(),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.lock().unwrap().value.clone()
    }

    /// Merge `patch` into the current value and publish the result.
    pub fn set(&self, patch: impl Patch<T>) -> T {
        let (snapshot, observers) = {
            let mut inner = self.inner.lock().unwrap();
            patch.apply_to(&mut inner.value);
            (inner.value.clone(), inner.observers.clone())
        };
        for (_, observer) in &observers {
            observer(&snapshot);
        }
        snapshot
    }

    /// Replace the whole value. Same publish semantics as [`Store::set`].
    pub fn set_value(&self, value: T) -> T {
        let (snapshot, observers) = {
            let mut inner = self.inner.lock().unwrap();
            inner.value = value;
            (inner.value.clone(), inner.observers.clone())
        };
        for (_, observer) in &observers {
            observer(&snapshot);
        }
        snapshot
    }

    /// Register an observer. It is called immediately with the current
    /// value, then again after every change, until unsubscribed.
    pub fn subscribe(&self, observer: impl Fn(&T) + Send + Sync + 'static) -> u64 {
        let observer: Observer<T> = Arc::new(observer);
        let (id, snapshot) = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.push((id, Arc::clone(&observer)));
            (id, inner.value.clone())
        };
        observer(&snapshot);
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.inner
            .lock()
            .unwrap()
            .observers
            .retain(|(observer_id, _)| *observer_id != id);
    }
}

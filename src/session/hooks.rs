use futures::future::BoxFuture;
use tokio::sync::Mutex;

type Handler = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// An ordered list of async lifecycle callbacks.
///
/// `fire()` invokes every subscriber sequentially and awaits each one before
/// moving on, so the caller can rely on all subscribers having completed when
/// it returns. The stop sequence depends on this: the manager's watchdog is
/// cancelled by a "stopping" subscriber before teardown continues.
#[derive(Default)]
pub struct Event {
    handlers: Mutex<Vec<Handler>>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe<F>(&self, handler: F)
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.handlers.lock().await.push(Box::new(handler));
    }

    pub async fn fire(&self) {
        let handlers = self.handlers.lock().await;
        for handler in handlers.iter() {
            handler().await;
        }
    }
}

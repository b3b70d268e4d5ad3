//! A connection owned by a dedicated worker thread, fed through a channel.
//!
//! The connection does no locking of its own; serializing every call through
//! one worker is how applications share it between tasks.

use std::thread;

use sqlite_conn::{Connection, Control, Result, Value};
use tokio::sync::{mpsc, oneshot};

type Job = Box<dyn FnOnce(&mut Connection) + Send>;

struct Worker {
   tx: mpsc::UnboundedSender<Job>,
   handle: thread::JoinHandle<Connection>,
}

impl Worker {
   fn spawn(mut db: Connection) -> Self {
      let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
      let handle = thread::spawn(move || {
         while let Some(job) = rx.blocking_recv() {
            job(&mut db);
         }
         db
      });
      Self { tx, handle }
   }

   async fn run<T, F>(&self, f: F) -> T
   where
      T: Send + 'static,
      F: FnOnce(&mut Connection) -> T + Send + 'static,
   {
      let (reply, rx) = oneshot::channel();
      self
         .tx
         .send(Box::new(move |db: &mut Connection| {
            let _ = reply.send(f(db));
         }))
         .expect("worker stopped");
      rx.await.expect("worker dropped the job")
   }

   fn join(self) -> Connection {
      drop(self.tx);
      self.handle.join().expect("worker panicked")
   }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_serial_worker() {
   let _ = tracing_subscriber::fmt()
      .with_max_level(tracing::Level::TRACE)
      .with_test_writer()
      .try_init();

   let worker = Worker::spawn(Connection::memory().unwrap());

   worker
      .run(|db| db.exec("CREATE TABLE planets (id INTEGER PRIMARY KEY, au DOUBLE, name TEXT);"))
      .await
      .unwrap();

   let inserts: Vec<_> = [(0, 0.4, "Mercury"), (1, 0.7, "Venus"), (2, 1.0, "Earth"), (3, 1.5, "Mars")]
      .into_iter()
      .map(|(id, au, name)| {
         worker.run(move |db| {
            db.update(
               "INSERT INTO planets VALUES (?, ?, ?);",
               &[id.into(), au.into(), name.into()],
            )
         })
      })
      .collect();
   for insert in inserts {
      insert.await.unwrap();
   }

   let name = worker
      .run(|db: &mut Connection| -> Result<Option<Value>> {
         let mut name = None;
         db.query("SELECT name FROM planets WHERE au = 1;", |row| {
            name = row.ok().and_then(|r| r.get("name").cloned());
            Control::Continue
         })?;
         Ok(name)
      })
      .await;
   assert_eq!(name.unwrap(), Some(Value::Text("Earth".into())));

   let mut db = worker.join();
   assert_eq!(db.cached_statements(), 2);
   db.close().unwrap();
}

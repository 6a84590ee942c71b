//! INSERT statement batching
//!
//! Rows are produced on a scoped worker thread that owns the cursor and
//! batches tuples into statements. Finished statements are handed to the
//! caller through a capacity-one channel, so at most one complete statement
//! waits while the next one is being built.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;

use crate::dialect::Dialect;
use crate::encode::{column_list, quote_identifier};
use crate::errors::{DumpError, DumpErrorKind, Result};
use crate::source::DumpSource;
use crate::stream::RowStream;

/// Builds size-bounded multi-row INSERT statements
///
/// A statement with more than one tuple never exceeds `max_size` bytes
/// including its terminator. A single tuple that is already too large still
/// becomes a statement of its own.
#[derive(Debug)]
pub struct StatementBatcher {
    prefix: Vec<u8>,
    max_size: usize,
    buffer: Vec<u8>,
    statements: u64,
}

impl StatementBatcher {
    pub fn new(dialect: Dialect, object: &str, columns: &[String], max_size: usize) -> Self {
        let prefix = format!(
            "INSERT INTO {} ({}) VALUES ",
            quote_identifier(dialect, object),
            column_list(dialect, columns)
        );
        Self {
            prefix: prefix.into_bytes(),
            max_size,
            buffer: Vec::new(),
            statements: 0,
        }
    }

    /// Append one encoded tuple
    ///
    /// Returns the previous statement when the tuple did not fit into it.
    pub fn push(&mut self, tuple: &[u8]) -> Option<Vec<u8>> {
        let mut ready = None;
        if !self.buffer.is_empty()
            && self.buffer.len() + 1 + tuple.len() > self.max_size.saturating_sub(1)
        {
            ready = Some(self.take_statement());
        }

        if self.buffer.is_empty() {
            self.buffer.extend_from_slice(&self.prefix);
        } else {
            self.buffer.push(b',');
        }
        self.buffer.extend_from_slice(tuple);
        ready
    }

    /// Terminate and return the pending statement, if any
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.take_statement())
        }
    }

    /// Statements emitted so far
    pub fn statements(&self) -> u64 {
        self.statements
    }

    fn take_statement(&mut self) -> Vec<u8> {
        self.buffer.push(b';');
        self.statements += 1;
        std::mem::take(&mut self.buffer)
    }
}

/// Counters for one drained stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub rows: u64,
    pub statements: u64,
}

#[derive(Debug)]
enum BatchMessage {
    Statement(Vec<u8>),
    Finished(StreamStats),
    Failed(DumpError),
}

/// Drain `stream` into INSERT statements and pass each one to `consume`
///
/// The first error from either side is returned. When `consume` fails the
/// producer stops at its next hand-off and the cursor is released before
/// this returns.
pub fn stream_statements<C>(
    source: &mut dyn DumpSource,
    stream: RowStream,
    max_size: usize,
    mut consume: C,
) -> Result<StreamStats>
where
    C: FnMut(&[u8]) -> Result<()>,
{
    if stream.is_empty() {
        return Ok(StreamStats::default());
    }

    thread::scope(|scope| {
        let (tx, rx) = sync_channel::<BatchMessage>(1);
        let producer = thread::Builder::new()
            .name("sqldump-rows".to_string())
            .spawn_scoped(scope, move || produce(source, stream, max_size, tx))
            .map_err(|err| internal(&format!("failed to spawn row producer: {}", err)))?;

        let consumed = consume_statements(&rx, &mut consume);
        // Hanging up makes the producer's next send fail
        drop(rx);

        let joined = producer.join();
        match (consumed, joined) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(_)) => Err(internal("row producer panicked")),
            (Ok(stats), Ok(())) => Ok(stats),
        }
    })
}

fn produce(
    source: &mut dyn DumpSource,
    stream: RowStream,
    max_size: usize,
    tx: SyncSender<BatchMessage>,
) {
    let object = stream.name().to_string();
    let mut batcher = StatementBatcher::new(stream.dialect(), &object, stream.columns(), max_size);

    let drained = stream.drain(source, |tuple| {
        if let Some(statement) = batcher.push(tuple) {
            send(&tx, &object, BatchMessage::Statement(statement))?;
        }
        Ok(())
    });

    let outcome = drained.and_then(|rows| {
        if let Some(statement) = batcher.finish() {
            send(&tx, &object, BatchMessage::Statement(statement))?;
        }
        Ok(StreamStats {
            rows,
            statements: batcher.statements(),
        })
    });

    let last = match outcome {
        Ok(stats) => BatchMessage::Finished(stats),
        Err(err) if err.kind() == DumpErrorKind::Cancelled => {
            tracing::debug!(object = %object, "Statement consumer hung up; row cursor released");
            return;
        }
        Err(err) => BatchMessage::Failed(err),
    };
    // A closed channel means the consumer already has its own error
    let _ = tx.send(last);
}

fn send(tx: &SyncSender<BatchMessage>, object: &str, message: BatchMessage) -> Result<()> {
    tx.send(message).map_err(|_| {
        DumpError::new(DumpErrorKind::Cancelled)
            .with_op("stream_statements")
            .with_object(object)
            .with_message("statement consumer stopped")
    })
}

fn consume_statements<C>(rx: &Receiver<BatchMessage>, consume: &mut C) -> Result<StreamStats>
where
    C: FnMut(&[u8]) -> Result<()>,
{
    loop {
        match rx.recv() {
            Ok(BatchMessage::Statement(statement)) => consume(&statement)?,
            Ok(BatchMessage::Finished(stats)) => return Ok(stats),
            Ok(BatchMessage::Failed(err)) => return Err(err),
            Err(_) => return Err(internal("row producer ended without a result")),
        }
    }
}

fn internal(message: &str) -> DumpError {
    DumpError::new(DumpErrorKind::Internal)
        .with_op("stream_statements")
        .with_message(message.to_string())
}

//! IBM i access through the system ODBC driver manager.
//!
//! ODBC connection handles are not `Send`, so each connection lives on its
//! own worker thread for its whole lifetime. The async side talks to it over
//! a channel and the worker disconnects when the channel closes.

use async_trait::async_trait;
use odbc_api::{
    buffers::TextRowSet, parameter::InputParameter, Connection, ConnectionOptions, Cursor, DataType,
    Environment, IntoParameter, ResultSetMetadata,
};
use once_cell::sync::OnceCell;
use serde_json::{Number, Value};
use std::sync::mpsc;
use std::thread::JoinHandle;
use tokio::sync::oneshot;

use super::{ConnectionDescriptor, RemoteConnection, RemoteDriver, RemoteError, RowSet};
use crate::catalog::SqlStatement;

const BATCH_SIZE: usize = 500;
/// Per-cell buffer in bytes. Longer values fail the fetch instead of being cut.
const MAX_TEXT_LEN: usize = 4096;

static ENVIRONMENT: OnceCell<Environment> = OnceCell::new();

fn environment() -> Result<&'static Environment, RemoteError> {
    ENVIRONMENT
        .get_or_try_init(Environment::new)
        .map_err(|e| RemoteError::Driver(format!("ODBC environment unavailable: {}", e)))
}

pub struct OdbcDriver {
    driver: String,
}

impl OdbcDriver {
    /// `driver` is the registered driver name or the path to its library.
    pub fn new(driver: impl Into<String>) -> Result<Self, RemoteError> {
        environment()?;
        Ok(Self { driver: driver.into() })
    }
}

#[async_trait]
impl RemoteDriver for OdbcDriver {
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn RemoteConnection>, RemoteError> {
        let connection_string = descriptor.to_odbc_string(&self.driver);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (command_tx, command_rx) = mpsc::channel::<Command>();

        let worker = std::thread::Builder::new()
            .name(format!("odbc-{}", descriptor.credentials.host))
            .spawn(move || connection_worker(connection_string, ready_tx, command_rx))
            .map_err(|e| RemoteError::Driver(e.to_string()))?;

        ready_rx
            .await
            .map_err(|_| RemoteError::Driver("connection worker exited before connecting".into()))??;

        Ok(Box::new(OdbcConnection {
            commands: Some(command_tx),
            worker: Some(worker),
        }))
    }
}

struct Command {
    statement: SqlStatement,
    reply: oneshot::Sender<Result<RowSet, RemoteError>>,
}

fn connection_worker(
    connection_string: String,
    ready: oneshot::Sender<Result<(), RemoteError>>,
    commands: mpsc::Receiver<Command>,
) {
    let connection = match environment().and_then(|env| {
        env.connect_with_connection_string(&connection_string, ConnectionOptions::default())
            .map_err(|e| RemoteError::Connect(e.to_string()))
    }) {
        Ok(connection) => connection,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if ready.send(Ok(())).is_err() {
        return;
    }

    for command in commands {
        let result = execute(&connection, &command.statement);
        let _ = command.reply.send(result);
    }
}

fn execute(connection: &Connection<'_>, statement: &SqlStatement) -> Result<RowSet, RemoteError> {
    let params: Vec<Box<dyn InputParameter>> = statement
        .params
        .iter()
        .map(|p| Box::new(p.clone().into_parameter()) as Box<dyn InputParameter>)
        .collect();

    let query_err = |e: odbc_api::Error| RemoteError::Query(e.to_string());

    let mut cursor = match connection.execute(&statement.query, params.as_slice(), None).map_err(query_err)? {
        Some(cursor) => cursor,
        None => return Ok(RowSet::default()),
    };

    let columns = cursor
        .column_names()
        .map_err(query_err)?
        .collect::<Result<Vec<String>, _>>()
        .map_err(query_err)?;

    let mut kinds = Vec::with_capacity(columns.len());
    for index in 1..=columns.len() {
        kinds.push(ColumnKind::from(cursor.col_data_type(index as u16).map_err(query_err)?));
    }

    let buffer = TextRowSet::for_cursor(BATCH_SIZE, &mut cursor, Some(MAX_TEXT_LEN)).map_err(query_err)?;
    let mut block = cursor.bind_buffer(buffer).map_err(query_err)?;

    let mut rows = Vec::new();
    while let Some(batch) = block.fetch_with_truncation_check(true).map_err(query_err)? {
        for row in 0..batch.num_rows() {
            let values = (0..batch.num_cols())
                .map(|col| match batch.at(col, row) {
                    Some(bytes) => kinds[col].to_value(&String::from_utf8_lossy(bytes)),
                    None => Value::Null,
                })
                .collect();
            rows.push(values);
        }
    }

    Ok(RowSet::new(columns, rows))
}

#[derive(Debug, Clone, Copy)]
enum ColumnKind {
    Integer,
    Fractional,
    Text,
}

impl From<DataType> for ColumnKind {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => ColumnKind::Integer,
            DataType::Decimal { scale: 0, .. } | DataType::Numeric { scale: 0, .. } => ColumnKind::Integer,
            DataType::Decimal { .. }
            | DataType::Numeric { .. }
            | DataType::Real
            | DataType::Float { .. }
            | DataType::Double => ColumnKind::Fractional,
            _ => ColumnKind::Text,
        }
    }
}

impl ColumnKind {
    fn to_value(self, text: &str) -> Value {
        let trimmed = text.trim();
        let number = match self {
            ColumnKind::Integer => trimmed.parse::<i64>().ok().map(Number::from),
            ColumnKind::Fractional => trimmed.parse::<f64>().ok().and_then(Number::from_f64),
            ColumnKind::Text => None,
        };
        number.map(Value::Number).unwrap_or_else(|| Value::String(text.to_string()))
    }
}

struct OdbcConnection {
    commands: Option<mpsc::Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

#[async_trait]
impl RemoteConnection for OdbcConnection {
    async fn query(&mut self, statement: &SqlStatement) -> Result<RowSet, RemoteError> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| RemoteError::Driver("connection already closed".into()))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        commands
            .send(Command { statement: statement.clone(), reply: reply_tx })
            .map_err(|_| RemoteError::Driver("connection worker is gone".into()))?;

        reply_rx
            .await
            .map_err(|_| RemoteError::Driver("connection worker dropped the query".into()))?
    }

    async fn close(mut self: Box<Self>) -> Result<(), RemoteError> {
        // Closing the channel ends the worker loop, which drops (disconnects) the handle
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .map_err(|e| RemoteError::Driver(e.to_string()))?
                .map_err(|_| RemoteError::Driver("connection worker panicked".into()))?;
        }
        Ok(())
    }

    fn detach(mut self: Box<Self>) {
        // The worker disconnects on its own once the running statement returns
        self.commands.take();
        self.worker.take();
    }
}

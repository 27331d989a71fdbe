//! Stream adapters over storage engines.
//!
//! [`find_stream`] exposes a query's results as a stream of records, and [`write_stream`]
//! persists every record of an incoming stream with
//! [`create_or_update`](crate::engine::StorageEngine::create_or_update).

use futures::{
    Stream, StreamExt, TryStreamExt,
    stream::{self, BoxStream},
};

use crate::{
    engine::StorageEngine,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{FindOptions, Query},
    record::Record,
};

/// Streams the records matching a query.
pub fn find_stream<'a, E>(
    engine: &'a E,
    query: Query,
    options: FindOptions,
) -> BoxStream<'a, DocumentStoreResult<Record>>
where
    E: StorageEngine + ?Sized,
{
    stream::once(engine.find(query, options))
        .map_ok(|records| stream::iter(records.into_iter().map(Ok::<_, DocumentStoreError>)))
        .try_flatten()
        .boxed()
}

/// Writes every incoming record, yielding the stored copy or the error for each.
///
/// Records without an identity value are created, records whose identity is stored are
/// merged onto it, and records with an unknown identity are created with that identity.
pub fn write_stream<'a, E, S>(engine: &'a E, records: S) -> BoxStream<'a, DocumentStoreResult<Record>>
where
    E: StorageEngine + ?Sized,
    S: Stream<Item = Record> + Send + 'a,
{
    records
        .then(move |record| engine.create_or_update(record))
        .boxed()
}

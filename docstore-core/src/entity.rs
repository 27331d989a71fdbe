//! Entity stores: schema-aware, hook-driven access to a storage engine.
//!
//! An [`EntityStore`] makes sure only validated, schema-conformant, hook-approved data
//! reaches its engine. Creates and updates are stripped of undeclared properties, cast to
//! the declared types, then run through a pipeline:
//!
//! - create: `before_create_validate` → schema validation → `before_create`
//! - update: `before_update_validate` → schema validation → `before_update`
//!
//! Any stage failing aborts the mutation before the engine is touched, and the caller gets
//! a [`Rejection`] carrying the error and the record exactly as it was supplied.
//!
//! # Events
//!
//! Entity stores publish their own events, separate from the engine's, and only once an
//! operation has succeeded: `Create`, `Update`, `Delete`, `DeleteMany`, `Find`, `FindOne`
//! and `Count`. Engine failures are published as `Error`.
//!
//! # Example
//!
//! ```ignore
//! use docstore::prelude::*;
//!
//! let contacts = EntityStore::builder("contact", MemoryEngine::new(), schema)
//!     .before_create(stage_fn("stamp", |mut record: Record| async move {
//!         record.insert("created".into(), "now".into());
//!         Ok(record)
//!     }))
//!     .build();
//!
//! let stored = contacts.create(into_record(json!({ "name": "Ada" }))?).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    dataset::DataSet,
    engine::{StorageEngine, UpdateMode},
    error::{DocumentStoreError, DocumentStoreResult, Rejection},
    event::{Event, Observer, Observers},
    pipeline::{Pipeline, Stage},
    query::{FindOptions, Query},
    record::{Record, RecordId},
    schema::{Schema, ValidationErrors},
};

/// Settings passed to the schema during updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityStoreOptions {
    /// Named validation set applied on top of the always-on rules.
    pub validation_set: Option<String>,
    /// Restricts stripping and validation to properties carrying this tag.
    pub tag: Option<String>,
}

struct ValidateStage<S> {
    schema: Arc<S>,
    validation_set: Option<String>,
    tag: Option<String>,
}

#[async_trait]
impl<S: Schema + 'static> Stage<Record> for ValidateStage<S> {
    fn name(&self) -> &str {
        "validate"
    }

    async fn apply(&self, record: Record) -> DocumentStoreResult<Record> {
        let errors = self
            .schema
            .validate(&record, self.validation_set.as_deref(), self.tag.as_deref())
            .await;

        if errors.is_empty() {
            Ok(record)
        } else {
            Err(DocumentStoreError::Validation(errors))
        }
    }
}

#[derive(Debug)]
pub struct EntityStore<E: StorageEngine, S: Schema> {
    name: String,
    engine: E,
    schema: Arc<S>,
    options: EntityStoreOptions,
    create_pipeline: Pipeline<Record>,
    update_pipeline: Pipeline<Record>,
    before_delete: Pipeline<RecordId>,
    observers: Observers,
}

impl<E: StorageEngine, S: Schema + 'static> EntityStore<E, S> {
    /// Starts configuring an entity store named `name` over `engine`.
    pub fn builder(name: impl Into<String>, engine: E, schema: S) -> EntityStoreBuilder<E, S> {
        EntityStoreBuilder::new(name, engine, schema)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the engine's identity property.
    pub fn id_property(&self) -> &str {
        self.engine.id_property()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    pub fn options(&self) -> &EntityStoreOptions {
        &self.options
    }

    /// Registers an observer for this store's events.
    pub async fn subscribe(&self, observer: Arc<dyn Observer>) {
        self.observers.subscribe(observer).await
    }

    /// Validates a record against the schema using this store's options.
    pub async fn validate(&self, record: &Record) -> ValidationErrors {
        self.schema
            .validate(record, self.options.validation_set.as_deref(), self.options.tag.as_deref())
            .await
    }

    /// Creates a new entity.
    ///
    /// # Errors
    ///
    /// Returns the validation or hook error, or the engine error, together with the
    /// caller's unprocessed record.
    pub async fn create(&self, record: Record) -> Result<Record, Rejection<Record>> {
        let clean = self.clean(&record, None);

        let processed = match self.create_pipeline.run(clean).await {
            Ok(processed) => processed,
            Err(rejection) => return Err(Rejection::new(rejection.error, record)),
        };

        match self.engine.create(processed).await {
            Ok(stored) => {
                info!(
                    entity = %self.name,
                    id = ?RecordId::of(&stored, self.id_property()),
                    "{} created", self.name,
                );
                self.observers.emit(Event::Create(stored.clone())).await;
                Ok(stored)
            }
            Err(error) => {
                warn!(entity = %self.name, %error, "error on create");
                Err(self.fail(error, record).await)
            }
        }
    }

    /// Creates entities one after another, stopping at the first rejection.
    ///
    /// Entities created before the failure stay stored.
    pub async fn create_many(
        &self,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<Vec<Record>, Rejection<Record>> {
        let mut stored = Vec::new();

        for record in records {
            stored.push(self.create(record).await?);
        }

        Ok(stored)
    }

    /// Merges `record` onto the stored entity with the given identity value.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::EntityNotFound`] if no such entity exists, or the
    /// validation, hook or engine error, together with the caller's unprocessed record.
    pub async fn update(
        &self,
        id: impl Into<RecordId>,
        record: Record,
    ) -> Result<Record, Rejection<Record>> {
        self.update_with(id, record, UpdateMode::Merge).await
    }

    /// Like [`update`](Self::update), with an explicit merge or overwrite mode.
    pub async fn update_with(
        &self,
        id: impl Into<RecordId>,
        record: Record,
        mode: UpdateMode,
    ) -> Result<Record, Rejection<Record>> {
        let id = id.into();
        let clean = self.clean(&record, self.options.tag.as_deref());

        let mut processed = match self.update_pipeline.run(clean).await {
            Ok(processed) => processed,
            Err(rejection) => return Err(Rejection::new(rejection.error, record)),
        };

        processed.insert(self.id_property().to_string(), id.to_value());

        match self.engine.update(processed, mode).await {
            Ok(saved) => {
                info!(entity = %self.name, %id, "{} updated", self.name);
                self.observers
                    .emit(Event::Update { record: saved.clone(), mode })
                    .await;
                Ok(saved)
            }
            Err(DocumentStoreError::DocumentNotFound { .. }) => {
                warn!(entity = %self.name, %id, "unable to find {} for update", self.name);
                Err(self.fail(self.not_found(&id), record).await)
            }
            Err(error) => {
                warn!(entity = %self.name, %id, %error, "error on update");
                Err(self.fail(error, record).await)
            }
        }
    }

    /// Reads the entity with the given identity value.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::EntityNotFound`] if no such entity exists.
    pub async fn read(&self, id: impl Into<RecordId>) -> DocumentStoreResult<Record> {
        let id = id.into();

        self.engine
            .read(id.clone())
            .await?
            .ok_or_else(|| self.not_found(&id))
    }

    /// Returns every entity matching the query.
    pub async fn find(&self, query: Query) -> DocumentStoreResult<DataSet> {
        self.find_with(query, FindOptions::default()).await
    }

    /// Returns every entity matching the query, shaped by `options`.
    pub async fn find_with(
        &self,
        query: Query,
        options: FindOptions,
    ) -> DocumentStoreResult<DataSet> {
        let records = self
            .engine
            .find(query.clone(), options)
            .await?;

        self.observers.emit(Event::Find(query)).await;

        Ok(DataSet::new(records))
    }

    /// Returns the first entity matching the query.
    pub async fn find_one(&self, query: Query) -> DocumentStoreResult<Option<Record>> {
        self.find_one_with(query, FindOptions::default()).await
    }

    /// Returns the first entity matching the query, shaped by `options`.
    pub async fn find_one_with(
        &self,
        query: Query,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<Record>> {
        let record = self
            .engine
            .find_one(query.clone(), options)
            .await?;

        self.observers.emit(Event::FindOne(query)).await;

        Ok(record)
    }

    /// Counts the entities matching the query.
    pub async fn count(&self, query: Query) -> DocumentStoreResult<usize> {
        let count = self.engine.count(query.clone()).await?;

        self.observers.emit(Event::Count(query)).await;

        Ok(count)
    }

    /// Deletes the entity with the given identity value.
    ///
    /// `before_delete` hooks run first and may veto the deletion.
    ///
    /// # Errors
    ///
    /// Returns the hook error, or [`DocumentStoreError::EntityNotFound`] if no such
    /// entity exists.
    pub async fn delete(&self, id: impl Into<RecordId>) -> DocumentStoreResult<()> {
        let id = self
            .before_delete
            .run(id.into())
            .await
            .map_err(Rejection::into_error)?;

        match self.engine.delete(id.clone()).await {
            Ok(()) => {
                info!(entity = %self.name, %id, "{} deleted", self.name);
                self.observers.emit(Event::Delete(id)).await;
                Ok(())
            }
            Err(DocumentStoreError::DocumentNotFound { .. }) => {
                let error = self.not_found(&id);
                self.observers.emit(Event::Error(error.clone())).await;
                Err(error)
            }
            Err(error) => {
                warn!(entity = %self.name, %id, %error, "error on delete");
                self.observers.emit(Event::Error(error.clone())).await;
                Err(error)
            }
        }
    }

    /// Deletes every entity matching the query and returns how many were removed.
    pub async fn delete_by_query(&self, query: Query) -> DocumentStoreResult<usize> {
        match self.engine.delete_many(query.clone()).await {
            Ok(deleted) => {
                info!(entity = %self.name, deleted, "{} deleted by query", self.name);
                self.observers.emit(Event::DeleteMany(query)).await;
                Ok(deleted)
            }
            Err(error) => {
                warn!(entity = %self.name, %error, "error on delete by query");
                self.observers.emit(Event::Error(error.clone())).await;
                Err(error)
            }
        }
    }

    /// Strips and casts a record, carrying the caller's identity value through.
    fn clean(&self, record: &Record, tag: Option<&str>) -> Record {
        let mut clean = self.schema.cast(
            self.schema
                .strip_unknown_properties(record.clone(), tag),
        );

        if let Some(id) = record.get(self.id_property()) {
            clean
                .entry(self.id_property())
                .or_insert_with(|| id.clone());
        }

        clean
    }

    fn not_found(&self, id: &RecordId) -> DocumentStoreError {
        DocumentStoreError::EntityNotFound {
            entity: self.name.clone(),
            property: self.id_property().to_string(),
            id: id.to_string(),
        }
    }

    async fn fail(&self, error: DocumentStoreError, original: Record) -> Rejection<Record> {
        self.observers.emit(Event::Error(error.clone())).await;
        Rejection::new(error, original)
    }
}

/// Configures an [`EntityStore`]: options and hook stages.
pub struct EntityStoreBuilder<E, S> {
    name: String,
    engine: E,
    schema: Arc<S>,
    options: EntityStoreOptions,
    before_create_validate: Pipeline<Record>,
    before_create: Pipeline<Record>,
    before_update_validate: Pipeline<Record>,
    before_update: Pipeline<Record>,
    before_delete: Pipeline<RecordId>,
}

impl<E: StorageEngine, S: Schema + 'static> EntityStoreBuilder<E, S> {
    pub fn new(name: impl Into<String>, engine: E, schema: S) -> Self {
        Self {
            name: name.into(),
            engine,
            schema: Arc::new(schema),
            options: EntityStoreOptions::default(),
            before_create_validate: Pipeline::named("beforeCreateValidate"),
            before_create: Pipeline::named("beforeCreate"),
            before_update_validate: Pipeline::named("beforeUpdateValidate"),
            before_update: Pipeline::named("beforeUpdate"),
            before_delete: Pipeline::named("beforeDelete"),
        }
    }

    pub fn options(mut self, options: EntityStoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validation_set(mut self, set: impl Into<String>) -> Self {
        self.options.validation_set = Some(set.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.options.tag = Some(tag.into());
        self
    }

    /// Adds a stage that runs on creates before schema validation.
    pub fn before_create_validate(mut self, stage: impl Stage<Record> + 'static) -> Self {
        self.before_create_validate.add(stage);
        self
    }

    /// Adds a stage that runs on creates after schema validation.
    pub fn before_create(mut self, stage: impl Stage<Record> + 'static) -> Self {
        self.before_create.add(stage);
        self
    }

    /// Adds a stage that runs on updates before schema validation.
    pub fn before_update_validate(mut self, stage: impl Stage<Record> + 'static) -> Self {
        self.before_update_validate.add(stage);
        self
    }

    /// Adds a stage that runs on updates after schema validation.
    pub fn before_update(mut self, stage: impl Stage<Record> + 'static) -> Self {
        self.before_update.add(stage);
        self
    }

    /// Adds a stage that receives the identity value before a delete.
    pub fn before_delete(mut self, stage: impl Stage<RecordId> + 'static) -> Self {
        self.before_delete.add(stage);
        self
    }

    pub fn build(self) -> EntityStore<E, S> {
        let mut create_pipeline = Pipeline::named(format!("{}.create", self.name));
        create_pipeline
            .add(self.before_create_validate)
            .add(ValidateStage {
                schema: self.schema.clone(),
                validation_set: None,
                tag: None,
            })
            .add(self.before_create);

        let mut update_pipeline = Pipeline::named(format!("{}.update", self.name));
        update_pipeline
            .add(self.before_update_validate)
            .add(ValidateStage {
                schema: self.schema.clone(),
                validation_set: self.options.validation_set.clone(),
                tag: self.options.tag.clone(),
            })
            .add(self.before_update);

        EntityStore {
            name: self.name,
            engine: self.engine,
            schema: self.schema,
            options: self.options,
            create_pipeline,
            update_pipeline,
            before_delete: self.before_delete,
            observers: Observers::new(),
        }
    }
}

//! A single resource and the data streams its sources produce.

use crate::factory::{Factory, Flavor, ResourceVariant};
use crate::handler::ResourceHandler;
use crate::CoreError;
use datapackage_schema::{Descriptor, ValidationErrors};
use datapackage_stream::{DataSource, DataStream, StreamError};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::debug;

/// A resource descriptor bound to a base path.
///
/// Every `path` entry becomes one data stream, in declaration order,
/// followed by one stream for inline `data` when present.
pub struct Resource {
    descriptor: Descriptor,
    base_path: Option<PathBuf>,
    variant: ResourceVariant,
    flavor: Flavor,
    factory: Factory,
    handler: Option<Arc<dyn ResourceHandler>>,
    streams: Option<Vec<DataStream>>,
    // Keeps an extracted archive alive while the resource is in use.
    _workdir: Option<Arc<TempDir>>,
}

impl Resource {
    pub(crate) fn new(
        descriptor: Descriptor,
        base_path: Option<PathBuf>,
        variant: ResourceVariant,
        flavor: Flavor,
        factory: Factory,
        handler: Option<Arc<dyn ResourceHandler>>,
    ) -> Self {
        Self {
            descriptor,
            base_path,
            variant,
            flavor,
            factory,
            handler,
            streams: None,
            _workdir: None,
        }
    }

    pub(crate) fn with_workdir(mut self, workdir: Option<Arc<TempDir>>) -> Self {
        self._workdir = workdir;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Mutable access to the descriptor. Open streams are dropped; call
    /// [`Resource::revalidate`] to check the edited descriptor.
    pub fn descriptor_mut(&mut self) -> &mut Descriptor {
        self.streams = None;
        &mut self.descriptor
    }

    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    pub fn variant(&self) -> &ResourceVariant {
        &self.variant
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn is_tabular(&self) -> bool {
        self.flavor == Flavor::Tabular
    }

    /// The declared sources: each `path` entry, then inline `data`.
    pub fn data_sources(&self) -> Vec<DataSource> {
        let base = self.base_path.as_deref();
        let mut sources: Vec<DataSource> = self
            .descriptor
            .paths()
            .into_iter()
            .map(|path| DataSource::from_path(path, base))
            .collect();
        if let Some(data) = self.descriptor.data() {
            sources.push(DataSource::Inline(data.clone()));
        }
        sources
    }

    /// Open one stream over `source`: through the registered handler when it
    /// opens one, otherwise in this resource's flavor.
    pub fn open_data_stream(&self, source: DataSource) -> Result<DataStream, StreamError> {
        if let Some(stream) = self
            .handler
            .as_ref()
            .and_then(|h| h.open_data_stream(&self.descriptor, &source))
        {
            return stream;
        }
        match self.flavor {
            Flavor::Default => DataStream::open_default(source),
            Flavor::Tabular => {
                let schema = self.descriptor.schema().unwrap_or(&Value::Null);
                DataStream::open_tabular(source, schema, self.descriptor.get("dialect"))
            }
        }
    }

    fn open_streams(&self) -> Result<Vec<DataStream>, CoreError> {
        let mut streams = Vec::new();
        for source in self.data_sources() {
            let mut stream = self.open_data_stream(source)?;
            stream.rewind()?;
            streams.push(stream);
        }
        Ok(streams)
    }

    /// The data streams of this resource, opened on first use and kept
    /// until the descriptor changes or a fresh pass is started.
    pub fn data_streams(&mut self) -> Result<&mut [DataStream], CoreError> {
        let streams = match self.streams.take() {
            Some(streams) => streams,
            None => self.open_streams()?,
        };
        Ok(self.streams.insert(streams).as_mut_slice())
    }

    /// Read the rows of every stream in order, stopping once `limit` rows
    /// have been collected. Each call starts a fresh pass.
    pub fn read(&mut self, limit: Option<usize>) -> Result<Vec<Value>, CoreError> {
        self.streams = None;
        let limit = limit.unwrap_or(usize::MAX);
        let mut rows = Vec::new();
        if limit == 0 {
            return Ok(rows);
        }
        for stream in self.data_streams()? {
            for row in stream {
                rows.push(row?);
                if rows.len() == limit {
                    return Ok(rows);
                }
            }
        }
        debug!(
            "read {} rows from resource '{}'",
            rows.len(),
            self.name().unwrap_or_default()
        );
        Ok(rows)
    }

    /// A fresh pass over the rows of every stream, flattened.
    pub fn rows(&self) -> Result<impl Iterator<Item = Result<Value, StreamError>>, CoreError> {
        Ok(self.open_streams()?.into_iter().flatten())
    }

    /// Persist the raw data of every stream next to `prefix` and return the
    /// written files. A single stream is written to `<prefix>.<ext>`, several
    /// streams to `<prefix>-data-<j>`.
    pub fn save(&self, prefix: &Path) -> Result<Vec<PathBuf>, CoreError> {
        let sources = self.data_sources();
        let prefix = prefix.to_string_lossy();
        let single = sources.len() == 1;
        let mut written = Vec::with_capacity(sources.len());
        for (j, source) in sources.into_iter().enumerate() {
            let target = if single {
                match self.saved_extension(&source) {
                    Some(ext) => PathBuf::from(format!("{prefix}.{ext}")),
                    None => PathBuf::from(prefix.as_ref()),
                }
            } else {
                PathBuf::from(format!("{prefix}-data-{j}"))
            };
            self.open_data_stream(source)?.save(&target)?;
            written.push(target);
        }
        Ok(written)
    }

    fn saved_extension(&self, source: &DataSource) -> Option<String> {
        if self.is_tabular() {
            return Some("csv".to_owned());
        }
        match source {
            DataSource::Inline(_) => Some("json".to_owned()),
            other => other.extension(),
        }
    }

    /// Validate the current descriptor against the resource's profile.
    pub fn revalidate(&self) -> Result<(), CoreError> {
        let errors = self
            .factory
            .validate_resource_descriptor(&self.descriptor, self.base_path());
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::ResourceValidationFailed(ValidationErrors::new(errors)))
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("descriptor", &self.descriptor)
            .field("base_path", &self.base_path)
            .field("variant", &self.variant)
            .field("flavor", &self.flavor)
            .field("handler", &self.handler.as_ref().map(|h| h.name().to_owned()))
            .finish_non_exhaustive()
    }
}

impl From<Resource> for Descriptor {
    fn from(resource: Resource) -> Self {
        resource.descriptor
    }
}

impl From<&Resource> for Descriptor {
    fn from(resource: &Resource) -> Self {
        resource.descriptor.clone()
    }
}

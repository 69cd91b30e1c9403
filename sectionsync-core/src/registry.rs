use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sectionsync_model::{Section, SectionFamily};
use tracing::debug;

use crate::pipeline::{
    SectionFetcher, SectionPipeline, SectionUpdater, TypedPipeline,
};

/// Maps each section to the pipeline that refreshes it.
///
/// Built once at startup and read-only afterwards.
#[derive(Default, Clone)]
pub struct PipelineRegistry {
    pipelines: HashMap<Section, Arc<dyn SectionPipeline>>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the fetcher and updater of `section`, replacing any
    /// previous registration.
    pub fn register<F, U>(
        &mut self,
        section: impl Into<Section>,
        fetcher: F,
        updater: U,
    ) -> &mut Self
    where
        F: SectionFetcher,
        U: SectionUpdater<F::Payload>,
    {
        self.register_pipeline(
            section,
            Arc::new(TypedPipeline::new(fetcher, updater)),
        )
    }

    pub fn register_pipeline(
        &mut self,
        section: impl Into<Section>,
        pipeline: Arc<dyn SectionPipeline>,
    ) -> &mut Self {
        let section = section.into();
        if self.pipelines.insert(section, pipeline).is_some() {
            debug!("Replaced pipeline for section {}", section);
        }
        self
    }

    /// Builder-style [`PipelineRegistry::register`].
    pub fn with<F, U>(
        mut self,
        section: impl Into<Section>,
        fetcher: F,
        updater: U,
    ) -> Self
    where
        F: SectionFetcher,
        U: SectionUpdater<F::Payload>,
    {
        self.register(section, fetcher, updater);
        self
    }

    pub fn get(&self, section: Section) -> Option<Arc<dyn SectionPipeline>> {
        self.pipelines.get(&section).cloned()
    }

    pub fn contains(&self, section: Section) -> bool {
        self.pipelines.contains_key(&section)
    }

    /// Registered sections in stable order.
    pub fn sections(&self) -> Vec<Section> {
        let mut sections: Vec<Section> =
            self.pipelines.keys().copied().collect();
        sections.sort();
        sections
    }

    pub fn sections_of(&self, family: SectionFamily) -> Vec<Section> {
        self.sections()
            .into_iter()
            .filter(|section| section.family() == family)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

impl fmt::Debug for PipelineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRegistry")
            .field("sections", &self.sections())
            .finish()
    }
}

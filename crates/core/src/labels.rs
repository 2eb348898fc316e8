//! Standard `app.kubernetes.io/*` labelling conventions for objects managed
//! on behalf of a resource.

use std::collections::BTreeMap;
use std::sync::Arc;

use itertools::Itertools;

use crate::types::ObjectMeta;

/// Name of the application.
pub const APP_NAME_LABEL: &str = "app.kubernetes.io/name";
/// Unique name identifying the instance of an application.
pub const APP_INSTANCE_LABEL: &str = "app.kubernetes.io/instance";
/// Current version of the application.
pub const APP_VERSION_LABEL: &str = "app.kubernetes.io/version";
/// Component within the architecture of an application.
pub const APP_COMPONENT_LABEL: &str = "app.kubernetes.io/component";
/// Higher level application this one is part of.
pub const APP_PART_OF_LABEL: &str = "app.kubernetes.io/part-of";
/// Tool managing the operation of an application.
pub const APP_MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
/// Controller or user who created the object.
pub const APP_CREATED_BY_LABEL: &str = "app.kubernetes.io/created-by";

type LabelFn = Arc<dyn Fn(&ObjectMeta) -> BTreeMap<String, String> + Send + Sync>;
type VersionFn = Arc<dyn Fn(&ObjectMeta) -> String + Send + Sync>;

/// Logical component tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppComponent<'a> {
    #[default]
    None,
    Named(&'a str),
}

/// Merge `src` into `dst`; entries from `src` win.
pub fn merge_string_maps(
    src: BTreeMap<String, String>,
    mut dst: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    dst.extend(src);
    dst
}

/// Produces names and labels for objects owned by a resource.
#[derive(Clone)]
pub struct LabelProvider {
    application: String,
    creator: Option<String>,
    manager: Option<String>,
    version: Option<VersionFn>,
    dynamic_labels: Option<LabelFn>,
}

impl std::fmt::Debug for LabelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelProvider")
            .field("application", &self.application)
            .field("creator", &self.creator)
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

impl LabelProvider {
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            creator: None,
            manager: None,
            version: None,
            dynamic_labels: None,
        }
    }

    #[must_use]
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    #[must_use]
    pub fn with_manager(mut self, manager: impl Into<String>) -> Self {
        self.manager = Some(manager.into());
        self
    }

    /// Derive the version label from the owning object.
    #[must_use]
    pub fn with_version<F>(mut self, f: F) -> Self
    where
        F: Fn(&ObjectMeta) -> String + Send + Sync + 'static,
    {
        self.version = Some(Arc::new(f));
        self
    }

    /// Extra labels derived from the owning object. These override the
    /// name, instance, creator, manager and version labels.
    #[must_use]
    pub fn with_dynamic_labels<F>(mut self, f: F) -> Self
    where
        F: Fn(&ObjectMeta) -> BTreeMap<String, String> + Send + Sync + 'static,
    {
        self.dynamic_labels = Some(Arc::new(f));
        self
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    /// `<name>-<application>[-<component>]`
    pub fn instance_name(&self, owner: &ObjectMeta, component: AppComponent<'_>) -> String {
        let tag = match component {
            AppComponent::None => None,
            AppComponent::Named(c) => Some(c),
        };
        [owner.name.as_str(), self.application.as_str()]
            .into_iter()
            .chain(tag)
            .join("-")
    }

    /// Full label set for an object owned by `owner`.
    ///
    /// `extra` entries override everything else.
    pub fn standard_labels(
        &self,
        owner: &ObjectMeta,
        component: AppComponent<'_>,
        extra: Option<BTreeMap<String, String>>,
    ) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::from([
            (APP_NAME_LABEL.to_string(), self.application.clone()),
            (APP_INSTANCE_LABEL.to_string(), owner.name.clone()),
        ]);

        if let Some(creator) = &self.creator {
            labels.insert(APP_CREATED_BY_LABEL.to_string(), creator.clone());
        }
        if let Some(manager) = &self.manager {
            labels.insert(APP_MANAGED_BY_LABEL.to_string(), manager.clone());
        }
        if let Some(version) = &self.version {
            labels.insert(APP_VERSION_LABEL.to_string(), version(owner));
        }
        if let Some(dynamic) = &self.dynamic_labels {
            labels = merge_string_maps(dynamic(owner), labels);
        }
        if let AppComponent::Named(c) = component {
            labels.insert(APP_COMPONENT_LABEL.to_string(), c.to_string());
        }
        if let Some(extra) = extra {
            labels = merge_string_maps(extra, labels);
        }

        labels
    }

    /// Minimal selector labels for objects owned by `owner`.
    pub fn match_labels(
        &self,
        owner: &ObjectMeta,
        component: AppComponent<'_>,
    ) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::from([
            (APP_NAME_LABEL.to_string(), self.application.clone()),
            (APP_INSTANCE_LABEL.to_string(), owner.name.clone()),
        ]);
        if let AppComponent::Named(c) = component {
            labels.insert(APP_COMPONENT_LABEL.to_string(), c.to_string());
        }
        labels
    }
}

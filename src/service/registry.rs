//! Service registry with id, capability and default-alias resolution.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::capability::CapabilityType;
use super::service::AiService;
use super::types::{ServiceError, ServiceResult};

/// Alias under which an id-less service is registered and preferred by
/// [`ServiceRegistry::resolve`] when no id is requested.
pub const DEFAULT_SERVICE_ID: &str = "default";

type ServiceEntry = (String, Arc<dyn AiService>);

/// Insertion-ordered service table. Lookups clone out `Arc` handles; the
/// table itself is shared, so clones of the registry observe the same state.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: Arc<RwLock<Vec<ServiceEntry>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service under its own id (empty id keys as `"default"`).
    /// Overwriting keeps the original insertion position.
    #[tracing::instrument(level = "debug", skip(self, service))]
    pub fn register(&self, service: Arc<dyn AiService>, overwrite: bool) -> ServiceResult<()> {
        let id = match service.service_id() {
            "" => DEFAULT_SERVICE_ID.to_string(),
            id => id.to_string(),
        };
        let mut services = self.services.write().unwrap();
        match services.iter().position(|(existing, _)| *existing == id) {
            Some(position) => {
                if !overwrite {
                    return Err(ServiceError::DuplicateService(id));
                }
                debug!("overwriting service '{}'", id);
                services[position].1 = service;
            }
            None => {
                debug!("registered service '{}'", id);
                services.push((id, service));
            }
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn unregister(&self, service_id: &str) -> ServiceResult<()> {
        let mut services = self.services.write().unwrap();
        let position = services
            .iter()
            .position(|(id, _)| id.as_str() == service_id)
            .ok_or_else(|| ServiceError::ServiceNotFound(service_id.to_string()))?;
        services.remove(position);
        Ok(())
    }

    /// Resolves a service:
    /// an explicit id is looked up exactly and then checked against the
    /// requested capability; with no id, the `"default"` entry wins when it
    /// qualifies, then the first other entry (insertion order) satisfying the
    /// capability, then — capability-free — the first entry outright.
    pub fn resolve(
        &self,
        service_id: Option<&str>,
        capability: Option<CapabilityType>,
    ) -> ServiceResult<Arc<dyn AiService>> {
        let services = self.services.read().unwrap();

        if let Some(id) = service_id {
            let service = services
                .iter()
                .find(|(existing, _)| existing.as_str() == id)
                .map(|(_, service)| service.clone())
                .ok_or_else(|| ServiceError::ServiceNotFound(id.to_string()))?;
            if let Some(capability) = capability {
                if !service.capabilities().supports(&capability) {
                    return Err(ServiceError::ServiceTypeMismatch {
                        id: id.to_string(),
                        capability,
                    });
                }
            }
            return Ok(service);
        }

        if let Some((_, service)) = services
            .iter()
            .find(|(id, _)| id.as_str() == DEFAULT_SERVICE_ID)
        {
            match &capability {
                None => return Ok(service.clone()),
                Some(c) if service.capabilities().supports(c) => return Ok(service.clone()),
                Some(_) => {}
            }
        }

        match capability {
            Some(capability) => services
                .iter()
                .filter(|(id, _)| id.as_str() != DEFAULT_SERVICE_ID)
                .find(|(_, service)| service.capabilities().supports(&capability))
                .map(|(_, service)| service.clone())
                .ok_or(ServiceError::NoServiceOfType(capability)),
            None => services
                .first()
                .map(|(_, service)| service.clone())
                .ok_or_else(|| ServiceError::ServiceNotFound(DEFAULT_SERVICE_ID.to_string())),
        }
    }

    /// All services supporting the capability, keyed by id. Order-insignificant.
    pub fn list_by_capability(
        &self,
        capability: &CapabilityType,
    ) -> HashMap<String, Arc<dyn AiService>> {
        self.services
            .read()
            .unwrap()
            .iter()
            .filter(|(_, service)| service.capabilities().supports(capability))
            .map(|(id, service)| (id.clone(), service.clone()))
            .collect()
    }

    pub fn clear(&self) {
        self.services.write().unwrap().clear();
    }

    pub fn contains(&self, service_id: &str) -> bool {
        self.services
            .read()
            .unwrap()
            .iter()
            .any(|(id, _)| id.as_str() == service_id)
    }

    /// Registered ids in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.services
            .read()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.services.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().unwrap().is_empty()
    }
}

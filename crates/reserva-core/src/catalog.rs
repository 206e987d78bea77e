//! Read-only reference data: the tenant's services and providers.
//!
//! Lookup is intentionally heuristic (lowercased substring matching), not
//! natural-language understanding; the dialogue rules depend on exactly
//! these semantics.

use crate::types::{Provider, Service};

/// The tenant's service/provider data set with free-text lookup.
#[derive(Debug, Clone)]
pub struct Catalog {
    services: Vec<Service>,
    providers: Vec<Provider>,
}

impl Catalog {
    pub fn new(services: Vec<Service>, providers: Vec<Provider>) -> Self {
        Self {
            services,
            providers,
        }
    }

    /// Built-in demo data set: four services, three providers.
    pub fn demo() -> Self {
        let services = vec![
            Service {
                id: "1".to_string(),
                name: "Masaje Relajante".to_string(),
                description: "60 minutos de relajación".to_string(),
                duration_minutes: 60,
                category: None,
                price: Some(45_000),
                active: true,
            },
            Service {
                id: "2".to_string(),
                name: "Consulta Dermatológica".to_string(),
                description: "Evaluación con especialista".to_string(),
                duration_minutes: 30,
                category: None,
                price: Some(35_000),
                active: true,
            },
            Service {
                id: "3".to_string(),
                name: "Limpieza Facial".to_string(),
                description: "Tratamiento facial completo".to_string(),
                duration_minutes: 45,
                category: None,
                price: Some(28_000),
                active: true,
            },
            Service {
                id: "4".to_string(),
                name: "Yoga Personal".to_string(),
                description: "Sesión personalizada 1:1".to_string(),
                duration_minutes: 60,
                category: None,
                price: Some(32_000),
                active: true,
            },
        ];
        let providers = vec![
            Provider {
                id: "p1".to_string(),
                name: "Dra. Ana López".to_string(),
                bio: Some("Especialista en medicina general".to_string()),
                timezone: "America/Santiago".to_string(),
                active: true,
                service_ids: vec!["1".to_string(), "2".to_string()],
            },
            Provider {
                id: "p2".to_string(),
                name: "Carlos Ruiz".to_string(),
                bio: Some("Masajista terapéutico".to_string()),
                timezone: "America/Santiago".to_string(),
                active: true,
                service_ids: vec!["1".to_string()],
            },
            Provider {
                id: "p3".to_string(),
                name: "Laura M.".to_string(),
                bio: Some("Instructora de Yoga".to_string()),
                timezone: "America/Santiago".to_string(),
                active: true,
                service_ids: vec!["4".to_string()],
            },
        ];
        Self::new(services, providers)
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn active_services(&self) -> Vec<Service> {
        self.services.iter().filter(|s| s.active).cloned().collect()
    }

    pub fn active_providers(&self) -> Vec<Provider> {
        self.providers
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect()
    }

    pub fn service_by_id(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn provider_by_id(&self, id: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// First active service whose name occurs in `text` (case-insensitive).
    pub fn find_service_in(&self, text: &str) -> Option<&Service> {
        let lower = text.to_lowercase();
        self.services
            .iter()
            .filter(|s| s.active)
            .find(|s| lower.contains(&s.name.to_lowercase()))
    }

    /// First active provider mentioned in `text` (case-insensitive).
    ///
    /// Matches the full name, or the leading word of the name when it is
    /// long enough to be distinctive (so "con ana lópez" and "dra. ana
    /// lópez" both resolve, but a stray two-letter particle does not).
    pub fn find_provider_in(&self, text: &str) -> Option<&Provider> {
        let lower = text.to_lowercase();
        self.providers.iter().filter(|p| p.active).find(|p| {
            let name = p.name.to_lowercase();
            if lower.contains(&name) {
                return true;
            }
            match name.split_whitespace().next() {
                Some(first) if first.len() >= 3 => lower.contains(first),
                _ => false,
            }
        })
    }

    /// Active services performed by the given provider, in catalog order.
    pub fn services_for(&self, provider: &Provider) -> Vec<Service> {
        self.services
            .iter()
            .filter(|s| s.active && provider.service_ids.contains(&s.id))
            .cloned()
            .collect()
    }

    /// Fallback provider id used when a booking is assembled without an
    /// explicit provider choice.
    pub fn default_provider_id(&self) -> Option<&str> {
        self.providers
            .iter()
            .find(|p| p.active)
            .map(|p| p.id.as_str())
    }
}

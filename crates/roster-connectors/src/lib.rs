//! # Roster Connectors
//!
//! Concrete [`Connector`](roster_core::Connector) implementations for the
//! identity systems roster reconciles against, and the registry that wires
//! them up under their slugs.
//!
//! | Slug        | System                         | External id        |
//! |-------------|--------------------------------|--------------------|
//! | `aws_sso`   | AWS IAM Identity Center        | SSO instance ARN   |
//! | `iam`       | AWS IAM                        | AWS account id     |
//! | `pagerduty` | PagerDuty                      | account domain     |
//! | `aptible`   | Aptible                        | organization id    |

#![warn(clippy::all)]

pub mod aptible;
pub mod aws;
pub mod pagerduty;
mod settings;

pub use aptible::Aptible;
pub use aws::{AwsSso, Iam};
pub use pagerduty::{PagerDuty, PagerDutyClient, PagerDutyUser};
pub use settings::ConnectorSettings;

use roster_core::{Connector, ConnectorRegistry, RegistryError};

/// Registry with every built-in connector, in listing order
pub fn builtin_registry(settings: &ConnectorSettings) -> Result<ConnectorRegistry, RegistryError> {
    let sso = settings.clone();
    let iam = settings.clone();
    let pagerduty = settings.clone();
    let aptible = settings.clone();

    Ok(ConnectorRegistry::builder()
        .register(aws::sso::SLUG, move || -> Box<dyn Connector> {
            Box::new(AwsSso::new(&sso))
        })?
        .register(aws::iam::SLUG, move || -> Box<dyn Connector> {
            Box::new(Iam::new(&iam))
        })?
        .register(pagerduty::SLUG, move || -> Box<dyn Connector> {
            Box::new(PagerDuty::new(&pagerduty))
        })?
        .register(aptible::SLUG, move || -> Box<dyn Connector> {
            Box::new(Aptible::new(&aptible))
        })?
        .build())
}

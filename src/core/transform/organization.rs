//! Organization conversions

use crate::domain::resource::{ContactPoint, Identifier};
use crate::domain::{BusinessIdentifier, Organization, OrganizationDetail};

/// Identifier system for organizations when none is configured
pub const DEFAULT_ORGANIZATION_IDENTIFIER_SYSTEM: &str = "urn:fhirbridge:organization-identifier";

/// Builds a new active Organization with one work phone
pub fn new_organization(
    identifier: &BusinessIdentifier,
    name: &str,
    phone: &str,
    identifier_system: &str,
) -> Organization {
    Organization {
        identifier: vec![Identifier {
            use_: Some("official".to_string()),
            system: Some(identifier_system.to_string()),
            value: Some(identifier.to_string()),
        }],
        active: Some(true),
        name: Some(name.trim().to_string()),
        telecom: vec![ContactPoint {
            system: Some("phone".to_string()),
            value: Some(phone.trim().to_string()),
            use_: Some("work".to_string()),
        }],
        ..Default::default()
    }
}

/// Flattens a stored Organization
///
/// The identifier comes from `identifier_system` when present, otherwise
/// from the first identifier.
pub fn organization_to_detail(
    organization: &Organization,
    identifier_system: &str,
) -> OrganizationDetail {
    OrganizationDetail {
        resource_id: organization.id.clone(),
        identifier: organization
            .identifier_value(Some(identifier_system))
            .or_else(|| organization.identifier_value(None))
            .map(str::to_string),
        name: organization.name.clone(),
        phone: organization.telecom_value("phone").map(str::to_string),
        active: organization.active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_organization_roundtrips_to_detail() {
        let identifier = BusinessIdentifier::new("ORG0001").unwrap();
        let mut organization = new_organization(
            &identifier,
            " City Lab ",
            "+43 1 5550100",
            DEFAULT_ORGANIZATION_IDENTIFIER_SYSTEM,
        );
        organization.id = Some("org-1".to_string());

        let detail = organization_to_detail(&organization, DEFAULT_ORGANIZATION_IDENTIFIER_SYSTEM);

        assert_eq!(detail.resource_id.as_deref(), Some("org-1"));
        assert_eq!(detail.identifier.as_deref(), Some("ORG0001"));
        assert_eq!(detail.name.as_deref(), Some("City Lab"));
        assert_eq!(detail.phone.as_deref(), Some("+43 1 5550100"));
        assert_eq!(detail.active, Some(true));
    }

    #[test]
    fn test_detail_falls_back_to_first_identifier() {
        let organization = Organization {
            identifier: vec![Identifier {
                system: Some("urn:other".to_string()),
                value: Some("X-9".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let detail = organization_to_detail(&organization, DEFAULT_ORGANIZATION_IDENTIFIER_SYSTEM);
        assert_eq!(detail.identifier.as_deref(), Some("X-9"));
        assert!(detail.phone.is_none());
    }
}

use anyhow::Result;
use log::info;

use crate::error::CatalogError;
use crate::logic::{Outcome, ResourceService};
use crate::model::{Organization, OrganizationDraft};
use crate::store::Store;

const SEED_ACTOR: &str = "seed";

/// (identifier, name, abbreviation, url)
const HELMHOLTZ_CENTRES: &[(&str, &str, &str, &str)] = &[
    (
        "org-0c6a3d5e-5e1f-11ea-8a4b-0242ac130002",
        "Alfred-Wegener-Institut, Helmholtz-Zentrum für Polar- und Meeresforschung",
        "AWI",
        "https://www.awi.de",
    ),
    (
        "org-0c6a3f84-5e1f-11ea-8a4b-0242ac130002",
        "Deutsches Elektronen-Synchrotron",
        "DESY",
        "https://www.desy.de",
    ),
    (
        "org-0c6a40c4-5e1f-11ea-8a4b-0242ac130002",
        "Deutsches Krebsforschungszentrum",
        "DKFZ",
        "https://www.dkfz.de",
    ),
    (
        "org-0c6a41f0-5e1f-11ea-8a4b-0242ac130002",
        "Deutsches Zentrum für Luft- und Raumfahrt",
        "DLR",
        "https://www.dlr.de",
    ),
    (
        "org-0c6a4312-5e1f-11ea-8a4b-0242ac130002",
        "Helmholtz-Zentrum Dresden-Rossendorf",
        "HZDR",
        "https://www.hzdr.de",
    ),
    (
        "org-0c6a442a-5e1f-11ea-8a4b-0242ac130002",
        "Karlsruher Institut für Technologie",
        "KIT",
        "https://www.kit.edu",
    ),
];

/// Inserts the demonstration organizations. Identifiers are fixed, so running
/// this again refreshes the same nodes instead of adding new ones.
pub async fn load_seed_data<S: Store>(service: &ResourceService<S>) -> Result<()> {
    let mut created = 0;
    for (id, name, abbreviation, url) in HELMHOLTZ_CENTRES {
        let draft = OrganizationDraft {
            uuid: None,
            name: Some(name.to_string()),
            abbreviation: Some(abbreviation.to_string()),
            img: None,
            url: Some(url.to_string()),
        };
        let outcome = service
            .replace::<Organization>(id, draft, SEED_ACTOR)
            .await
            .map_err(|e| match e {
                CatalogError::Store(cause) => cause,
                other => anyhow::anyhow!("Failed to seed {}: {}", abbreviation, other),
            })?;
        if matches!(outcome, Outcome::Created(_)) {
            created += 1;
        }
    }
    info!(
        "Seed data loaded: {} organizations ({} new)",
        HELMHOLTZ_CENTRES.len(),
        created
    );
    Ok(())
}

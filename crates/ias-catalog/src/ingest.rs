use tracing::debug;
use url::Url;

use crate::error::{CatalogError, CatalogResult};
use crate::manifest::{
    cache_file_name, extract_package_name, parse_slot_id, to_https, ManifestDoc, PackageSource,
};
use crate::model::{AdCandidate, AdSlot, Catalog, InstalledSet};

/// Inputs that shape how a parsed manifest becomes catalog state.
pub struct IngestContext<'a> {
    /// Catalog from the previous session (or refresh), if any. Cursors,
    /// cache flags and download timestamps carry forward from it.
    pub previous: Option<&'a Catalog>,
    /// This app's own bundle identifier, used to flag self adverts.
    pub bundle_id: &'a str,
    pub installed: &'a InstalledSet,
    pub package_source: PackageSource,
}

pub struct IngestOutcome {
    pub catalog: Catalog,
    /// True when the merge saw slots with no prior state, meaning the
    /// cursors should be re-randomized before first display.
    pub fresh: bool,
}

/// Merges a parsed manifest with prior state into a new catalog.
///
/// Any malformed slot id aborts the whole ingest so a half-broken
/// manifest never replaces a good catalog. Duplicate slot letters keep
/// the first occurrence.
pub fn ingest_manifest(doc: &ManifestDoc, ctx: &IngestContext<'_>) -> CatalogResult<IngestOutcome> {
    let mut catalog = Catalog::default();
    let mut fresh = ctx.previous.is_none();

    for entry in &doc.slots {
        let id = parse_slot_id(&entry.slotid)?;

        let ad_url = Url::parse(&to_https(&entry.adurl))
            .map_err(|e| CatalogError::parse(format!("bad adurl for slot {id}: {e}")))?;
        let image_url = Url::parse(&to_https(&entry.imgurl))
            .map_err(|e| CatalogError::parse(format!("bad imgurl for slot {id}: {e}")))?;

        if catalog.slot(id.number).is_none() {
            let mut slot = AdSlot::new(id.number);
            if let Some(prev) = ctx.previous.and_then(|c| c.slot(id.number)) {
                slot.cursor = prev.cursor;
            } else {
                fresh = true;
            }
            catalog.slots.push(slot);
        }

        let slot = match catalog.slot_mut(id.number) {
            Some(slot) => slot,
            None => continue,
        };
        if slot.candidate(id.letter).is_some() {
            debug!(slot = %id, "ias-catalog: duplicate slot letter, keeping first");
            continue;
        }

        let package_name = extract_package_name(&ad_url, ctx.package_source);
        let is_self = !ctx.bundle_id.is_empty() && package_name.contains(ctx.bundle_id);

        let previous = ctx.previous.and_then(|c| c.candidate(id));
        let (last_updated, image_cached) = match previous {
            Some(prev) => {
                // A bumped timestamp invalidates whatever is on disk.
                let stale = entry.updatetime > prev.last_updated || prev.last_updated == 0;
                (prev.last_updated, !stale && prev.image_cached)
            }
            None => {
                fresh = true;
                (0, false)
            }
        };

        slot.candidates.push(AdCandidate {
            slot_letter: id.letter,
            ad_id: entry.adid,
            package_name: package_name.clone(),
            cache_file_name: cache_file_name(id, &image_url),
            ad_url,
            image_url,
            is_self,
            is_active: entry.active,
            is_installed: ctx.installed.contains(&package_name),
            last_updated,
            pending_update: entry.updatetime,
            image_cached,
            image_ready: false,
            downloading: false,
        });
    }

    debug!(
        slots = catalog.slots.len(),
        fresh, "ias-catalog: manifest ingested"
    );
    Ok(IngestOutcome { catalog, fresh })
}

#[cfg(test)]
mod tests {
    use crate::manifest::parse_manifest;
    use crate::model::SlotId;

    use super::*;

    fn manifest(json: &str) -> ManifestDoc {
        parse_manifest(json.as_bytes()).unwrap()
    }

    fn ctx<'a>(previous: Option<&'a Catalog>, installed: &'a InstalledSet) -> IngestContext<'a> {
        IngestContext {
            previous,
            bundle_id: "com.pickle.mygame",
            installed,
            package_source: PackageSource::QueryParam,
        }
    }

    const TWO_SLOT_MANIFEST: &str = r#"{"slots":[
        {"slotid":"1a","adid":10,"updatetime":100,"active":true,
         "adurl":"http://play.google.com/store/apps/details?id=com.pickle.other",
         "imgurl":"http://cdn.example.com/ads/one.jpg"},
        {"slotid":"1b","adid":11,"updatetime":200,"active":true,
         "adurl":"https://play.google.com/store/apps/details?id=com.pickle.mygame",
         "imgurl":"https://cdn.example.com/ads/two.png"}
    ]}"#;

    #[test]
    fn fresh_ingest_builds_catalog_and_flags_randomize() {
        let installed = InstalledSet::default();
        let doc = manifest(TWO_SLOT_MANIFEST);
        let outcome = ingest_manifest(&doc, &ctx(None, &installed)).unwrap();

        assert!(outcome.fresh);
        let slot = outcome.catalog.slot(1).unwrap();
        assert_eq!(slot.candidates.len(), 2);

        let a = slot.candidate('a').unwrap();
        assert_eq!(a.package_name, "com.pickle.other");
        assert_eq!(a.cache_file_name, "ias_1a.jpg");
        assert_eq!(a.image_url.scheme(), "https");
        assert!(!a.is_self);
        assert!(!a.image_cached);

        let b = slot.candidate('b').unwrap();
        assert!(b.is_self);
    }

    #[test]
    fn malformed_slot_id_aborts_whole_ingest() {
        let installed = InstalledSet::default();
        let doc = manifest(
            r#"{"slots":[
                {"slotid":"1a","adurl":"https://x.com/?id=a","imgurl":"https://x.com/a.png"},
                {"slotid":"oops","adurl":"https://x.com/?id=b","imgurl":"https://x.com/b.png"}
            ]}"#,
        );
        assert!(ingest_manifest(&doc, &ctx(None, &installed)).is_err());
    }

    #[test]
    fn carry_forward_keeps_cache_when_timestamp_unchanged() {
        let installed = InstalledSet::default();
        let doc = manifest(TWO_SLOT_MANIFEST);
        let mut first = ingest_manifest(&doc, &ctx(None, &installed)).unwrap().catalog;

        // Simulate a completed download for 1a.
        {
            let a = first.candidate_mut(SlotId::new(1, 'a')).unwrap();
            a.image_cached = true;
            a.last_updated = 100;
        }
        first.slot_mut(1).unwrap().cursor = 1;

        let again = ingest_manifest(&doc, &ctx(Some(&first), &installed)).unwrap();
        assert!(!again.fresh);
        assert_eq!(again.catalog.slot(1).unwrap().cursor, 1);
        let a = again.catalog.candidate(SlotId::new(1, 'a')).unwrap();
        assert!(a.image_cached);
        assert!(!a.needs_fetch());
    }

    #[test]
    fn bumped_timestamp_invalidates_cached_image() {
        let installed = InstalledSet::default();
        let doc = manifest(TWO_SLOT_MANIFEST);
        let mut first = ingest_manifest(&doc, &ctx(None, &installed)).unwrap().catalog;
        {
            let a = first.candidate_mut(SlotId::new(1, 'a')).unwrap();
            a.image_cached = true;
            a.last_updated = 100;
        }

        let bumped = TWO_SLOT_MANIFEST.replace("\"updatetime\":100", "\"updatetime\":150");
        let doc = manifest(&bumped);
        let again = ingest_manifest(&doc, &ctx(Some(&first), &installed)).unwrap();
        let a = again.catalog.candidate(SlotId::new(1, 'a')).unwrap();
        assert!(!a.image_cached);
        assert!(a.needs_fetch());
        // Unchanged sibling keeps nothing cached because it never downloaded.
        assert!(again.catalog.candidate(SlotId::new(1, 'b')).unwrap().needs_fetch());
    }

    #[test]
    fn duplicate_letters_keep_first_entry() {
        let installed = InstalledSet::default();
        let doc = manifest(
            r#"{"slots":[
                {"slotid":"1a","adid":1,"adurl":"https://x.com/?id=first","imgurl":"https://x.com/a.png"},
                {"slotid":"1a","adid":2,"adurl":"https://x.com/?id=second","imgurl":"https://x.com/b.png"}
            ]}"#,
        );
        let outcome = ingest_manifest(&doc, &ctx(None, &installed)).unwrap();
        let slot = outcome.catalog.slot(1).unwrap();
        assert_eq!(slot.candidates.len(), 1);
        assert_eq!(slot.candidates[0].ad_id, 1);
    }

    #[test]
    fn installed_packages_are_flagged() {
        let installed = InstalledSet::new(["com.pickle.other"]);
        let doc = manifest(TWO_SLOT_MANIFEST);
        let outcome = ingest_manifest(&doc, &ctx(None, &installed)).unwrap();
        assert!(outcome.catalog.candidate(SlotId::new(1, 'a')).unwrap().is_installed);
        assert!(!outcome.catalog.candidate(SlotId::new(1, 'b')).unwrap().is_installed);
    }
}

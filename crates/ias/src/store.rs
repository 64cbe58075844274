use ias_catalog::PackageSource;
use url::Url;

const PICKLE_BASE: &str = "https://ias.gamepicklestudios.com/ad";
const GUMDROP_BASE: &str = "https://ads2.gumdropgames.com/ad";

/// Distribution store the running build shipped through. Each supported
/// store maps to a manifest source id on one of the advert servers;
/// anything else disables the engine outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStore {
    GooglePlay,
    AmazonAppStore,
    AppleAppStore,
    Other,
}

/// Resolved store identity: which manifest to pull and how package
/// names are carried in advert URLs for this storefront.
#[derive(Debug, Clone)]
pub struct StoreIdentity {
    store: AppStore,
    bundle_id: String,
    tv: bool,
}

impl StoreIdentity {
    pub fn new(store: AppStore, bundle_id: impl Into<String>, tv: bool) -> Self {
        Self { store, bundle_id: bundle_id.into(), tv }
    }

    pub fn store(&self) -> AppStore {
        self.store
    }

    fn is_pickle(&self) -> bool {
        self.bundle_id.starts_with("com.pickle.")
    }

    /// Manifest source id, `None` when the store is unsupported.
    pub fn source_id(&self) -> Option<u32> {
        match self.store {
            AppStore::GooglePlay => Some(if self.is_pickle() {
                if self.tv { 6 } else { 1 }
            } else if self.tv {
                8
            } else {
                4
            }),
            AppStore::AmazonAppStore => Some(if self.tv { 22 } else { 2 }),
            AppStore::AppleAppStore => Some(if self.is_pickle() { 3 } else { 9 }),
            AppStore::Other => None,
        }
    }

    fn server_base(&self) -> &'static str {
        // Pickle bundles pull from the pickle server, everything else
        // from the gumdrop one, matching the source-id split.
        match self.store {
            AppStore::AmazonAppStore => PICKLE_BASE,
            _ if self.is_pickle() => PICKLE_BASE,
            _ => GUMDROP_BASE,
        }
    }

    pub fn manifest_url(&self) -> Option<Url> {
        let id = self.source_id()?;
        Url::parse(&format!("{}/{id}.json", self.server_base())).ok()
    }

    pub fn package_source(&self) -> PackageSource {
        match self.store {
            AppStore::GooglePlay | AppStore::AmazonAppStore => PackageSource::QueryParam,
            AppStore::AppleAppStore => PackageSource::UrlFragment,
            AppStore::Other => PackageSource::FullUrl,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(AppStore::GooglePlay, "com.pickle.mygame", false, Some(1))]
    #[case(AppStore::GooglePlay, "com.pickle.mygame", true, Some(6))]
    #[case(AppStore::GooglePlay, "com.other.game", false, Some(4))]
    #[case(AppStore::AmazonAppStore, "com.pickle.mygame", false, Some(2))]
    #[case(AppStore::AmazonAppStore, "com.pickle.mygame", true, Some(22))]
    #[case(AppStore::AppleAppStore, "com.pickle.mygame", false, Some(3))]
    #[case(AppStore::AppleAppStore, "com.other.game", false, Some(9))]
    #[case(AppStore::Other, "com.pickle.mygame", false, None)]
    fn source_ids(
        #[case] store: AppStore,
        #[case] bundle: &str,
        #[case] tv: bool,
        #[case] expected: Option<u32>,
    ) {
        assert_eq!(StoreIdentity::new(store, bundle, tv).source_id(), expected);
    }

    #[test]
    fn manifest_url_embeds_source_id() {
        let identity = StoreIdentity::new(AppStore::GooglePlay, "com.pickle.mygame", false);
        assert_eq!(
            identity.manifest_url().unwrap().as_str(),
            "https://ias.gamepicklestudios.com/ad/1.json"
        );
    }

    #[test]
    fn non_pickle_bundle_uses_second_server() {
        let identity = StoreIdentity::new(AppStore::AppleAppStore, "com.other.game", false);
        assert_eq!(
            identity.manifest_url().unwrap().as_str(),
            "https://ads2.gumdropgames.com/ad/9.json"
        );
    }

    #[test]
    fn unsupported_store_has_no_manifest() {
        let identity = StoreIdentity::new(AppStore::Other, "com.pickle.mygame", false);
        assert!(identity.manifest_url().is_none());
    }

    #[test]
    fn package_sources_per_store() {
        let id = |s| StoreIdentity::new(s, "com.pickle.mygame", false);
        assert_eq!(id(AppStore::GooglePlay).package_source(), PackageSource::QueryParam);
        assert_eq!(id(AppStore::AppleAppStore).package_source(), PackageSource::UrlFragment);
        assert_eq!(id(AppStore::Other).package_source(), PackageSource::FullUrl);
    }
}

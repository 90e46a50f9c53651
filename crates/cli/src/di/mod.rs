use rsdns_application::use_cases::{HandleQueryUseCase, RefreshBlocklistsUseCase};
use rsdns_domain::Config;
use rsdns_infrastructure::dns::cache::NegativeTtl;
use rsdns_infrastructure::dns::{
    BlockList, BlockResponseMode, BlocklistDownloader, CachedAnswer, ChainValidator,
    LocalAddresses, NetworkExchanger, QueryHandler, RecursiveResolver, ResolverSettings, ResponseCache,
    ServerRegistry, TrustAnchorStore,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Every long-lived service the binary runs, wired from one [`Config`].
pub struct DnsServices {
    pub cache: Arc<ResponseCache>,
    pub block_list: Arc<BlockList>,
    pub refresh_blocklists: Option<Arc<RefreshBlocklistsUseCase>>,
    pub handler: QueryHandler,
}

impl DnsServices {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let cache = Arc::new(ResponseCache::from_config(&config.cache));
        let registry = Arc::new(ServerRegistry::from_config(&config.resolver)?);
        let exchanger = Arc::new(NetworkExchanger::new()?);

        let listeners: Vec<SocketAddr> = std::iter::once(config.server.bind.as_str())
            .chain(config.server.bind_tls.as_deref())
            .filter_map(|addr| addr.parse().ok())
            .collect();
        let local = LocalAddresses::for_listeners(&listeners);

        let settings = ResolverSettings::from_config(&config.resolver, &config.dnssec);
        let mut resolver = RecursiveResolver::new(
            Arc::clone(&cache),
            Arc::clone(&registry),
            exchanger,
            settings,
        )
        .with_negative_ttl(NegativeTtl::new(
            config.cache.negative_ttl_floor,
            config.cache.negative_ttl_max,
        ))
        .with_local_addresses(local);

        if config.dnssec.enabled {
            let anchors = TrustAnchorStore::from_lines(&config.dnssec.trust_anchors)?;
            if anchors.is_empty() {
                warn!("DNSSEC enabled without trust anchors; every answer will be insecure");
            }
            info!(anchors = anchors.len(), validate_all = config.dnssec.validate_all, "DNSSEC validation enabled");
            resolver = resolver.with_validator(Arc::new(ChainValidator::new(anchors)));
        }
        let resolver: Arc<RecursiveResolver> = Arc::new(resolver);

        let access = Arc::new(config.access.build()?);
        let block_list = Arc::new(BlockList::from_config(&config.blocking));

        let handle_query: Arc<HandleQueryUseCase<CachedAnswer>> = Arc::new(
            HandleQueryUseCase::new(access, block_list.clone(), resolver)
                .with_query_timeout(Duration::from_millis(config.resolver.query_timeout_ms))
                .with_blocking(config.blocking.enabled),
        );

        let refresh_blocklists = if config.blocking.enabled {
            let downloader = Arc::new(BlocklistDownloader::new(config.blocking.sources.clone())?);
            Some(Arc::new(RefreshBlocklistsUseCase::new(
                downloader,
                block_list.clone(),
                PathBuf::from(&config.blocking.dir),
            )))
        } else {
            None
        };

        let handler = QueryHandler::new(handle_query)
            .with_block_response(BlockResponseMode::from_config(&config.blocking))
            .with_edns_payload(config.resolver.edns_payload);

        Ok(Self {
            cache,
            block_list,
            refresh_blocklists,
            handler,
        })
    }
}

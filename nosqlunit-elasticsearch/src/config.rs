//! Rule configuration.

use crate::address::HttpHost;
use crate::client::ElasticsearchClient;
use crate::error::{ElasticsearchError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Connection settings shared by the client adapters.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Connection timeout. Only the REST adapter applies it; the high-level
    /// transport bounds connecting by the request timeout.
    pub connect_timeout: Duration,
    /// Request timeout.
    pub request_timeout: Duration,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
}

/// Default [`ClientSettings::connect_timeout`].
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: Duration::from_secs(30),
            username: None,
            password: None,
        }
    }
}

impl ClientSettings {
    /// Set basic authentication credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Credentials, when both parts are set.
    pub(crate) fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

/// Configuration of an Elasticsearch rule.
///
/// Built once per rule through [`ElasticsearchConfiguration::remote_elasticsearch`]
/// and friends; immutable afterwards.
pub struct ElasticsearchConfiguration<C> {
    connection_identifier: String,
    servers: Vec<HttpHost>,
    index_settings: BTreeMap<String, Value>,
    index_templates: BTreeMap<String, Value>,
    create_indices: bool,
    delete_all_indices: bool,
    client: C,
}

impl<C: ElasticsearchClient> ElasticsearchConfiguration<C> {
    /// Configuration for a node on `http://localhost:9200`.
    pub fn remote_elasticsearch() -> RemoteElasticsearchConfigurationBuilder<C> {
        Self::remote_elasticsearch_with(HttpHost::default())
    }

    /// Configuration for a single node.
    pub fn remote_elasticsearch_with(server: HttpHost) -> RemoteElasticsearchConfigurationBuilder<C> {
        Self::remote_elasticsearch_with_all([server])
    }

    /// Configuration for a set of nodes. Duplicates are dropped, order kept.
    pub fn remote_elasticsearch_with_all<I>(servers: I) -> RemoteElasticsearchConfigurationBuilder<C>
    where
        I: IntoIterator<Item = HttpHost>,
    {
        let mut unique: Vec<HttpHost> = Vec::new();
        for server in servers {
            if !unique.contains(&server) {
                unique.push(server);
            }
        }

        RemoteElasticsearchConfigurationBuilder {
            connection_identifier: String::new(),
            servers: unique,
            index_settings: BTreeMap::new(),
            index_templates: BTreeMap::new(),
            create_indices: true,
            delete_all_indices: false,
            settings: ClientSettings::default(),
            client: None,
        }
    }

    /// Configuration for the node named by `ELASTICSEARCH_URL`, falling back
    /// to `http://localhost:9200`.
    pub fn remote_elasticsearch_from_env() -> Result<RemoteElasticsearchConfigurationBuilder<C>> {
        Ok(Self::remote_elasticsearch_with(HttpHost::from_env()?))
    }
}

impl<C> ElasticsearchConfiguration<C> {
    /// Connection identifier.
    pub fn connection_identifier(&self) -> &str {
        &self.connection_identifier
    }

    /// Target nodes.
    pub fn servers(&self) -> &[HttpHost] {
        &self.servers
    }

    /// Settings per index.
    pub fn index_settings(&self) -> &BTreeMap<String, Value> {
        &self.index_settings
    }

    /// Templates per template name.
    pub fn index_templates(&self) -> &BTreeMap<String, Value> {
        &self.index_templates
    }

    /// Whether configured indices and templates are created on setup.
    pub fn is_create_indices(&self) -> bool {
        self.create_indices
    }

    /// Whether every index is deleted on setup.
    pub fn is_delete_all_indices(&self) -> bool {
        self.delete_all_indices
    }

    /// Client handle.
    pub fn client(&self) -> &C {
        &self.client
    }

    pub(crate) fn into_parts(self) -> ConfigurationParts<C> {
        ConfigurationParts {
            connection_identifier: self.connection_identifier,
            index_settings: self.index_settings,
            index_templates: self.index_templates,
            create_indices: self.create_indices,
            delete_all_indices: self.delete_all_indices,
            client: self.client,
        }
    }
}

impl<C> std::fmt::Debug for ElasticsearchConfiguration<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchConfiguration")
            .field("connection_identifier", &self.connection_identifier)
            .field("servers", &self.servers)
            .field("indices", &self.index_settings.keys().collect::<Vec<_>>())
            .field("templates", &self.index_templates.keys().collect::<Vec<_>>())
            .field("create_indices", &self.create_indices)
            .field("delete_all_indices", &self.delete_all_indices)
            .finish()
    }
}

pub(crate) struct ConfigurationParts<C> {
    pub connection_identifier: String,
    pub index_settings: BTreeMap<String, Value>,
    pub index_templates: BTreeMap<String, Value>,
    pub create_indices: bool,
    pub delete_all_indices: bool,
    pub client: C,
}

/// Builder for [`ElasticsearchConfiguration`].
pub struct RemoteElasticsearchConfigurationBuilder<C> {
    connection_identifier: String,
    servers: Vec<HttpHost>,
    index_settings: BTreeMap<String, Value>,
    index_templates: BTreeMap<String, Value>,
    create_indices: bool,
    delete_all_indices: bool,
    settings: ClientSettings,
    client: Option<C>,
}

impl<C: ElasticsearchClient> RemoteElasticsearchConfigurationBuilder<C> {
    /// Set the connection identifier.
    pub fn connection_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.connection_identifier = identifier.into();
        self
    }

    /// Create `index` with the given settings document on setup.
    pub fn index_settings(mut self, index: impl Into<String>, settings: Value) -> Self {
        self.index_settings.insert(index.into(), settings);
        self
    }

    /// Install the template `name` on setup.
    pub fn index_template(mut self, name: impl Into<String>, template: Value) -> Self {
        self.index_templates.insert(name.into(), template);
        self
    }

    /// Create configured indices and templates on setup (default `true`).
    pub fn create_indices(mut self, create: bool) -> Self {
        self.create_indices = create;
        self
    }

    /// Delete every index on the cluster on setup (default `false`).
    pub fn delete_all_indices(mut self, delete: bool) -> Self {
        self.delete_all_indices = delete;
        self
    }

    /// Set connection settings used when the client is built.
    pub fn client_settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use an already built client instead of connecting one.
    pub fn client(mut self, client: C) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the configuration, constructing the client if none was given.
    pub fn build(self) -> Result<ElasticsearchConfiguration<C>> {
        if self.servers.is_empty() {
            return Err(ElasticsearchError::InvalidAddress(
                "no Elasticsearch server configured".to_string(),
            ));
        }

        let client = match self.client {
            Some(client) => client,
            None => C::connect(&self.servers, &self.settings)?,
        };

        Ok(ElasticsearchConfiguration {
            connection_identifier: self.connection_identifier,
            servers: self.servers,
            index_settings: self.index_settings,
            index_templates: self.index_templates,
            create_indices: self.create_indices,
            delete_all_indices: self.delete_all_indices,
            client,
        })
    }
}

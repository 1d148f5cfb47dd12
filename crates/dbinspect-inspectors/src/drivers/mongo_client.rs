//! MongoDB binding over the synchronous `mongodb` client

use super::DriverOptions;
use crate::document::DocumentSession;
use dbinspect_core::{InspectError, Result, ServerDescriptor};
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::sync::Client;

/// One MongoDB client bound to a single server
pub struct MongoSession {
    target: String,
    client: Client,
}

impl MongoSession {
    /// Connect and verify the session with a `ping`
    pub fn open(server: &ServerDescriptor, options: &DriverOptions) -> Result<Self> {
        let target = server.address();
        if server.password_without_username() {
            return Err(InspectError::connection(
                &target,
                "password supplied without a user; refusing anonymous access",
            ));
        }

        let mut client_options = ClientOptions::default();
        client_options.hosts = vec![ServerAddress::Tcp {
            host: server.ip.clone(),
            port: Some(server.port),
        }];
        client_options.connect_timeout = Some(options.connect_timeout);
        client_options.server_selection_timeout = Some(options.connect_timeout);
        client_options.direct_connection = Some(true);

        if server.has_credentials() {
            let mut credential = Credential::default();
            credential.username = Some(server.username.clone());
            credential.password = Some(server.password.clone());
            client_options.credential = Some(credential);
        }

        let client = Client::with_options(client_options)
            .map_err(|e| InspectError::connection(&target, e))?;

        // The client connects lazily; force the handshake so bad
        // credentials surface as a connection error.
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .run()
            .map_err(|e| InspectError::connection(&target, e))?;

        Ok(Self { target, client })
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl DocumentSession for MongoSession {
    fn root_accounts(&self) -> Result<Vec<String>> {
        let users = self
            .client
            .database("admin")
            .collection::<Document>("system.users");

        let cursor = users
            .find(doc! { "roles": { "$elemMatch": { "role": "root" } } })
            .run()
            .map_err(|e| InspectError::check("DB-01", e))?;

        let mut accounts = Vec::new();
        for user in cursor {
            let user = user.map_err(|e| InspectError::check("DB-01", e))?;
            if let Ok(name) = user.get_str("user") {
                accounts.push(name.to_string());
            }
        }

        Ok(accounts)
    }

    fn database_names(&self) -> Result<Vec<String>> {
        self.client
            .list_database_names()
            .run()
            .map_err(|e| InspectError::check("DB-02", e))
    }

    fn collection_names(&self, database: &str) -> Result<Vec<String>> {
        self.client
            .database(database)
            .list_collection_names()
            .run()
            .map_err(|e| InspectError::check("DB-02", e))
    }
}

impl Drop for MongoSession {
    fn drop(&mut self) {
        tracing::debug!(server = %self.target, "Closing MongoDB session");
    }
}

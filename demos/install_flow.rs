//! Walks an installation end to end against a mocked Web API: install URL, callback, and a
//! request-time `authorize` that rotates the freshly issued bot token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
use httpmock::prelude::*;
use url::Url;
// self
use oauth2_installer::{
	auth::{InstallationQuery, ScopeList, TeamId},
	client::{ReqwestAuthClient, ReqwestHttpClient, ReqwestTransportErrorMapper},
	flows::{CallbackOptions, InstallProvider},
	state::InstallOptions,
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let exchange = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/oauth.v2.access");
			then.status(200).header("content-type", "application/json").body(
				"{\"ok\":true,\"access_token\":\"xoxe.xoxb-demo\",\"token_type\":\"bot\",\
				 \"scope\":\"chat:write\",\"bot_user_id\":\"U-BOT\",\"app_id\":\"A-DEMO\",\
				 \"team\":{\"id\":\"T-DEMO\",\"name\":\"Demo\"},\"refresh_token\":\"xoxe-demo\",\
				 \"expires_in\":300,\"authed_user\":{\"id\":\"U-DEMO\"}}",
			);
		})
		.await;
	let identity = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth.test");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"ok\":true,\"bot_id\":\"B-DEMO\"}");
		})
		.await;
	let client = ReqwestAuthClient::new(
		Url::parse(&server.url("/api"))?,
		ReqwestHttpClient::without_redirects()?,
		ReqwestTransportErrorMapper,
	);
	let provider = InstallProvider::builder("demo-client", "demo-secret")
		.auth_client(Arc::new(client))
		.installation_store(Arc::new(MemoryStore::default()))
		.state_secret("demo-state-secret-that-is-long-enough")
		.build()?;
	let options = InstallOptions::new(ScopeList::new(["chat:write"])?)
		.with_redirect_uri(Url::parse("https://demo.example.com/slack/oauth_redirect")?);
	let install_url = provider.generate_install_url(&options, true).await?;

	println!("Send the user to: {install_url}.");

	let state = install_url
		.query_pairs()
		.find_map(|(k, v)| (k == "state").then(|| v.into_owned()))
		.ok_or_else(|| eyre!("install URL has no state"))?;
	let success = provider
		.handle_callback(
			&format!("/slack/oauth_redirect?code=demo-code&state={state}"),
			&CallbackOptions::default(),
		)
		.await
		.map_err(|failure| eyre!(failure.error))?;

	println!(
		"Installed into team {:?} with bot {:?}.",
		success.installation.team_id(),
		success.installation.bot.as_ref().and_then(|bot| bot.id.as_ref()),
	);

	exchange.assert_async().await;
	identity.assert_async().await;
	exchange.delete_async().await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/oauth.v2.access");
			then.status(200).header("content-type", "application/json").body(
				"{\"ok\":true,\"access_token\":\"xoxe.xoxb-rotated\",\
				 \"refresh_token\":\"xoxe-rotated\",\"expires_in\":43200,\"token_type\":\"bot\"}",
			);
		})
		.await;
	let result = provider.authorize(&InstallationQuery::team(TeamId::new("T-DEMO")?)).await?;

	refresh.assert_async().await;

	println!(
		"Bot token rotated: {}; expires at {:?}.",
		result.bot_token.as_ref().map(|token| token.expose()).unwrap_or("<none>"),
		result.bot_token_expires_at,
	);
	println!("Rotation attempts recorded: {}.", provider.rotation_metrics().attempts());

	Ok(())
}

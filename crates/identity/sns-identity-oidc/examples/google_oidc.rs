//! Example showing how to set up Google sign-in with the OIDC engine
//!
//! This example demonstrates:
//! 1. Building the provider configuration from the environment
//! 2. Starting a flow and printing the redirect URL
//! 3. The callback shape that completes the flow
//! 4. Provisioning the validated identity into a user store

use sns_identity_core::InMemoryUserStore;
use sns_identity_oidc::{OidcConfig, OidcProvider, OidcProviderConfig, ProviderId};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let google_config = OidcProviderConfig::google(
        std::env::var("GOOGLE_CLIENT_ID").unwrap_or_else(|_| "your-google-client-id".to_string()),
        std::env::var("GOOGLE_CLIENT_SECRET")
            .unwrap_or_else(|_| "your-google-client-secret".to_string()),
        "http://localhost:8000/auth/google/sign_up/callback".to_string(),
    );

    let config = OidcConfig::new()
        .add_provider(google_config)
        .with_http_timeout(30);

    let engine = OidcProvider::new(config);
    let user_store = InMemoryUserStore::new();

    println!("OIDC Example - Google Sign-In");
    println!("=============================");

    // Step 1: start the flow. The state value must be stored in the user's
    // session (for example a cookie) before redirecting.
    let redirect = engine.start_flow(ProviderId::Google)?;
    println!("\n1. Redirect the user to:\n   {}", redirect.url);
    println!("\n2. Store this state in the session: {}", redirect.state);

    println!("\n3. At the callback, compare the returned state with the stored one");
    println!("   and complete the flow:");
    println!("   engine.complete_flow(ProviderId::Google, &stored_state, callback).await");

    // With real callback data, the rest of the flow looks like this:
    //
    // let identity = engine
    //     .complete_flow(ProviderId::Google, &stored_state, callback)
    //     .await?;
    // let user = user_store.provision(identity).await?;

    let _ = user_store;

    Ok(())
}

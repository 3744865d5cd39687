//! Atlassian MCP Server - flattened Jira and Confluence views via MCP
//!
//! Proxies the Jira and Confluence REST APIs as MCP tools served over stdio.

use atlassian_mcp_server::AtlassianMcpServer;
use pulseengine_mcp_server::McpServerBuilder;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ATLASSIAN_* settings may come from a local .env file
    dotenv::dotenv().ok();

    // Configure logging for STDIO transport
    AtlassianMcpServer::configure_stdio_logging();

    info!("Starting Atlassian MCP Server...");

    let atlassian_server = match AtlassianMcpServer::new().await {
        Ok(server) => {
            info!("Atlassian MCP Server created successfully");
            server
        }
        Err(e) => {
            error!("Failed to create Atlassian MCP Server: {}", e);
            eprintln!("❌ Failed to start Atlassian MCP Server: {}", e);
            eprintln!("\nPlease check:");
            eprintln!("  - ATLASSIAN_INSTANCE_URL environment variable is set");
            eprintln!("  - ATLASSIAN_EMAIL and ATLASSIAN_API_TOKEN are set (or ATLASSIAN_AUTH_TYPE)");
            eprintln!("  - The Atlassian instance is accessible");
            std::process::exit(1);
        }
    };

    info!("Starting MCP server with STDIO transport...");

    let mut server = atlassian_server.serve_stdio().await?;

    info!("🚀 Atlassian MCP Server is running and ready to serve requests");

    server.run().await?;

    Ok(())
}

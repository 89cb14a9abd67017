use log::error;

use vivogpt_gateway::AppConfig;

#[tokio::main]
async fn main()
{   dotenv::dotenv().ok();
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).init();

    // A JSON file, when given, replaces the environment entirely
    let config = match std::env::var("GATEWAY_CONFIG")
    {   Ok(path) => AppConfig::from_json_file(path)
      , Err(_) => AppConfig::from_env()
    };
    let config = match config
    {   Ok(c) => c
      , Err(e) => {
          error!("Configuration error: {}", e);
          std::process::exit(1);
        }
    };

    if let Err(e) = vivogpt_gateway::server::serve(config).await
    {   error!("Server error: {}", e);
        std::process::exit(1);
    }
}

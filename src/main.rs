use poise::serenity_prelude::{self as serenity};
use role_warden::{BOT_NAME, Config, Data, Error, commands, handlers, logging};
use serenity::GatewayIntents;
use tracing::{error, info, warn};

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };
    info!(
        guild_id = %config.guild_id,
        dry_run = config.policy.dry_run,
        scan_on_ready = config.scan_on_ready,
        "Starting {BOT_NAME}"
    );

    let token = config.token.clone();
    let data = Data::new(config);
    let framework_data = data.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::purgeunverified(), commands::purge()],
            pre_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_start(ctx).await;
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_end(ctx).await;
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    logging::log_command_error(&error);
                })
            },
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                let config = &framework_data.config;
                if ready.application.id != config.client_id {
                    warn!(
                        configured = %config.client_id,
                        connected = %ready.application.id,
                        "CLIENT_ID does not match the connected application"
                    );
                }

                logging::log_console("Registering slash commands...".to_string());
                match poise::builtins::register_in_guild(
                    ctx,
                    &framework.options().commands,
                    config.guild_id,
                )
                .await
                {
                    Ok(()) => info!(guild_id = %config.guild_id, "Slash commands registered"),
                    Err(err) => error!(error = %err, "Failed to register commands"),
                }

                Ok(framework_data)
            })
        })
        .build();

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::ClientBuilder::new(token, intents)
        .event_handler(handlers::Handler::new(data))
        .framework(framework)
        .await?;

    info!("Starting bot...");
    client.start().await?;

    Ok(())
}

fn main() {
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(Error::from)
        .and_then(|runtime| runtime.block_on(async_main()));

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

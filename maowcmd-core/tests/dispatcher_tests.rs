// tests/dispatcher_tests.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use maowcmd_common::models::{InboundEvent, PublishScope};
use maowcmd_core::Error;
use maowcmd_core::config::{HandlerConfig, HelpSettings, LoggerSettings, ReactionTrigger};
use maowcmd_core::repositories::InMemoryCooldownRepository;
use maowcmd_core::services::{
    Command, CommandBuilder, CommandEntry, CommandOutcome, CooldownStore, DenyReason, DispatchOutcome, Dispatcher,
    DispatcherState,
};
use maowcmd_core::test_utils::{ManualClock, PlatformCall, RecordingPlatform, interaction, text_message};

const START: i64 = 1_700_000_000_000;

struct Harness {
    platform: Arc<RecordingPlatform>,
    clock: Arc<ManualClock>,
    repo: Arc<InMemoryCooldownRepository>,
    dispatcher: Arc<Dispatcher>,
}

impl Harness {
    async fn new(config: HandlerConfig, commands: Vec<Command>) -> Result<Self, Error> {
        let platform = Arc::new(RecordingPlatform::new());
        let clock = Arc::new(ManualClock::new(START));
        let repo = Arc::new(InMemoryCooldownRepository::new());
        let store = Arc::new(CooldownStore::new(repo.clone(), clock.clone()));
        let dispatcher = Arc::new(Dispatcher::new(config, platform.clone(), store).with_self_user_id("bot"));
        dispatcher.load(commands.into_iter().map(CommandEntry::from).collect()).await?;
        platform.clear();
        Ok(Self {
            platform,
            clock,
            repo,
            dispatcher,
        })
    }

    async fn text(&self, author: &str, guild: Option<&str>, content: &str) -> Result<DispatchOutcome, Error> {
        let event = InboundEvent::Message(text_message("m1", author, guild, content));
        self.dispatcher.handle_event(event).await
    }

    async fn slash(&self, author: &str, guild: Option<&str>, command: &str) -> Result<DispatchOutcome, Error> {
        let event = InboundEvent::Interaction(interaction("i1", author, guild, command, vec![]));
        self.dispatcher.handle_event(event).await
    }
}

/// A command that counts its runs and replies "pong".
fn counting(names: &[&str], runs: &Arc<AtomicUsize>) -> CommandBuilder {
    let runs = runs.clone();
    Command::builder(names).description("test command").run(move |ctx| {
        let runs = runs.clone();
        async move {
            runs.fetch_add(1, Ordering::SeqCst);
            ctx.trigger.reply("pong").await?;
            Ok(CommandOutcome::Success)
        }
    })
}

#[tokio::test]
async fn ping_cooldown_end_to_end() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let ping = counting(&["ping"], &runs).cooldown("5000").react("🏓").build()?;
    let h = Harness::new(HandlerConfig::new("!"), vec![ping]).await?;

    assert_eq!(h.text("u", Some("g"), "!ping").await?, DispatchOutcome::Executed { success: true });
    assert_eq!(h.platform.reactions(), vec!["🏓"]);
    assert_eq!(h.platform.texts(), vec!["pong"]);
    let record = h.repo.snapshot("g").expect("record saved");
    assert_eq!(record.cooldowns.len(), 1);
    assert_eq!(record.cooldowns[0].user, "u");
    assert_eq!(record.cooldowns[0].command, "ping");
    assert_eq!(record.cooldowns[0].expires, START + 5_000);

    h.clock.advance(1_000);
    h.platform.clear();
    let outcome = h.text("u", Some("g"), "!ping").await?;
    assert_eq!(outcome, DispatchOutcome::Denied(DenyReason::Cooldown { remaining_ms: 4_000 }));
    assert_eq!(h.platform.texts(), vec!["This command is on cooldown for another 4 seconds."]);
    assert!(h.platform.reactions().is_empty());
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // Another user is unaffected by a per-user cooldown.
    assert_eq!(h.text("v", Some("g"), "!ping").await?, DispatchOutcome::Executed { success: true });

    h.clock.advance(4_000);
    assert_eq!(h.text("u", Some("g"), "!ping").await?, DispatchOutcome::Executed { success: true });
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    let record = h.repo.snapshot("g").expect("record saved");
    let mine: Vec<_> = record.cooldowns.iter().filter(|c| c.user == "u").collect();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].expires, START + 10_000);
    Ok(())
}

#[tokio::test]
async fn guild_cooldown_blocks_everyone() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let roll = counting(&["roll"], &runs).global_cooldown("1m").build()?;
    let h = Harness::new(HandlerConfig::new("!"), vec![roll]).await?;

    h.text("u", Some("g"), "!roll").await?;
    h.clock.advance(30_000);
    h.platform.clear();
    let outcome = h.text("v", Some("g"), "!roll").await?;
    assert_eq!(outcome, DispatchOutcome::Denied(DenyReason::GuildCooldown { remaining_ms: 30_000 }));
    assert_eq!(
        h.platform.texts(),
        vec!["This command is on cooldown for the entire server for another 30 seconds."]
    );

    // A different guild has its own record.
    assert_eq!(h.text("v", Some("other"), "!roll").await?, DispatchOutcome::Executed { success: true });
    Ok(())
}

#[tokio::test]
async fn cooldowns_do_not_apply_in_dms() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let ping = counting(&["ping"], &runs).cooldown("10m").build()?;
    let h = Harness::new(HandlerConfig::new("!"), vec![ping]).await?;

    h.text("u", None, "!ping").await?;
    assert_eq!(h.text("u", None, "!ping").await?, DispatchOutcome::Executed { success: true });
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert!(h.repo.snapshot("u").is_none());
    Ok(())
}

#[tokio::test]
async fn admin_only_denial_has_no_side_effects() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let ban = counting(&["ban"], &runs).admin_only(true).react("🔨").cooldown("1m").build()?;
    let mut config = HandlerConfig::new("!");
    config.admins = vec!["boss".into()];
    config.logging = Some(LoggerSettings {
        channels: vec!["log".into()],
        format: "$authorName$ ran $content$".into(),
    });
    let h = Harness::new(config, vec![ban]).await?;

    let outcome = h.text("pleb", Some("g"), "!ban someone").await?;
    assert_eq!(outcome, DispatchOutcome::Denied(DenyReason::NoAdmin));
    assert_eq!(
        h.platform.calls(),
        vec![PlatformCall::Send {
            channel_id: "c1".into(),
            content: "You can't run this command!".into(),
        }]
    );
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert!(h.repo.snapshot("g").is_none());

    h.platform.clear();
    assert_eq!(h.text("boss", Some("g"), "!ban someone").await?, DispatchOutcome::Executed { success: true });
    assert_eq!(h.platform.reactions(), vec!["🔨"]);
    assert!(h.platform.calls().contains(&PlatformCall::Send {
        channel_id: "log".into(),
        content: "user-boss ran !ban someone".into(),
    }));
    Ok(())
}

#[tokio::test]
async fn failed_commands_skip_post_processing() -> Result<(), Error> {
    let refuse = Command::builder(["refuse"])
        .description("always fails")
        .cooldown("1m")
        .react("✅")
        .run(|_ctx| async { Ok(CommandOutcome::Failure) })
        .build()?;
    let explode = Command::builder(["explode"])
        .description("returns an error")
        .cooldown("1m")
        .run(|_ctx| async { Err::<CommandOutcome, _>(anyhow::anyhow!("boom")) })
        .build()?;
    let panic = Command::builder(["panic"])
        .description("panics")
        .cooldown("1m")
        .run(|_ctx| async {
            if true {
                panic!("callback panicked");
            }
            Ok(CommandOutcome::Success)
        })
        .build()?;
    let h = Harness::new(HandlerConfig::new("!"), vec![refuse, explode, panic]).await?;

    for content in ["!refuse", "!explode", "!panic"] {
        assert_eq!(h.text("u", Some("g"), content).await?, DispatchOutcome::Executed { success: false });
    }
    assert!(h.platform.reactions().is_empty());
    assert!(h.repo.snapshot("g").is_none_or(|r| r.is_empty()));

    // The dispatcher keeps working after a panic.
    assert_eq!(h.text("u", Some("g"), "!refuse").await?, DispatchOutcome::Executed { success: false });
    Ok(())
}

#[tokio::test]
async fn callback_errors_reach_the_log_channels() -> Result<(), Error> {
    let refuse = Command::builder(["refuse"])
        .description("always fails")
        .run(|_ctx| async { Ok(CommandOutcome::Failure) })
        .build()?;
    let explode = Command::builder(["explode"])
        .description("returns an error")
        .run(|_ctx| async { Err::<CommandOutcome, _>(anyhow::anyhow!("boom")) })
        .build()?;
    let panic = Command::builder(["panic"])
        .description("panics")
        .run(|_ctx| async {
            if true {
                panic!("callback panicked");
            }
            Ok(CommandOutcome::Success)
        })
        .build()?;
    let mut config = HandlerConfig::new("!");
    config.logging = Some(LoggerSettings {
        channels: vec!["log".into()],
        format: "$authorName$ ran $content$".into(),
    });
    let h = Harness::new(config, vec![refuse, explode, panic]).await?;

    // A reported failure is not an error.
    h.text("u", Some("g"), "!refuse").await?;
    assert!(h.platform.calls().is_empty());

    h.text("u", Some("g"), "!explode").await?;
    h.text("u", Some("g"), "!panic").await?;
    assert_eq!(
        h.platform.calls(),
        vec![
            PlatformCall::Send {
                channel_id: "log".into(),
                content: "Command `explode` used by <@u> failed: boom".into(),
            },
            PlatformCall::Send {
                channel_id: "log".into(),
                content: "Command `panic` used by <@u> failed: callback panicked".into(),
            },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_guild_denial_is_silent() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let debug = counting(&["debug"], &runs).test_only(true).build()?;
    let mut config = HandlerConfig::new("!");
    config.test_guilds = vec!["lab".into()];
    let h = Harness::new(config, vec![debug]).await?;

    assert_eq!(
        h.text("u", Some("prod"), "!debug").await?,
        DispatchOutcome::Denied(DenyReason::TestGuildOnly)
    );
    assert_eq!(h.text("u", None, "!debug").await?, DispatchOutcome::Denied(DenyReason::TestGuildOnly));
    assert!(h.platform.calls().is_empty());
    assert_eq!(h.text("u", Some("lab"), "!debug").await?, DispatchOutcome::Executed { success: true });
    Ok(())
}

#[tokio::test]
async fn unknown_and_refused_kinds_are_ignored() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let text_only = counting(&["textonly"], &runs).no_interaction(true).build()?;
    let slash_only = counting(&["slashonly"], &runs).no_classic(true).build()?;
    let h = Harness::new(HandlerConfig::new("!"), vec![text_only, slash_only]).await?;

    assert_eq!(h.text("u", Some("g"), "hello there").await?, DispatchOutcome::Ignored);
    assert_eq!(h.text("u", Some("g"), "!nothing").await?, DispatchOutcome::Ignored);
    assert_eq!(h.text("u", Some("g"), "!slashonly").await?, DispatchOutcome::Ignored);
    assert_eq!(h.slash("u", Some("g"), "textonly").await?, DispatchOutcome::Ignored);
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    assert_eq!(h.text("u", Some("g"), "!TextOnly").await?, DispatchOutcome::Executed { success: true });
    assert_eq!(h.slash("u", Some("g"), "slashonly").await?, DispatchOutcome::Executed { success: true });
    Ok(())
}

#[tokio::test]
async fn own_and_bot_messages_are_ignored() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let ping = counting(&["ping"], &runs).build()?;
    let mut config = HandlerConfig::new("!");
    config.ignore_bots = true;
    let h = Harness::new(config, vec![ping]).await?;

    assert_eq!(h.text("bot", Some("g"), "!ping").await?, DispatchOutcome::Ignored);

    let mut from_bot = text_message("m2", "other-bot", Some("g"), "!ping");
    from_bot.author.bot = true;
    assert_eq!(h.dispatcher.handle_event(InboundEvent::Message(from_bot)).await?, DispatchOutcome::Ignored);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn pause_command_toggles_text_dispatch() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let ping = counting(&["ping"], &runs).build()?;
    let mut config = HandlerConfig::new("!");
    config.admins = vec!["boss".into()];
    config.pause_command = Some("pause".into());
    let h = Harness::new(config, vec![ping]).await?;

    assert_eq!(h.text("pleb", Some("g"), "!pause").await?, DispatchOutcome::Ignored);
    assert!(!h.dispatcher.is_paused());

    assert_eq!(h.text("boss", Some("g"), "!pause").await?, DispatchOutcome::PauseToggled(true));
    assert_eq!(h.text("boss", Some("g"), "!ping").await?, DispatchOutcome::Ignored);
    // Interactions keep working while paused.
    assert_eq!(h.slash("boss", Some("g"), "ping").await?, DispatchOutcome::Executed { success: true });

    assert_eq!(h.text("boss", Some("g"), "!pause").await?, DispatchOutcome::PauseToggled(false));
    assert_eq!(h.text("boss", Some("g"), "!ping").await?, DispatchOutcome::Executed { success: true });
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn reaction_triggers_fire_before_parsing() -> Result<(), Error> {
    let mut config = HandlerConfig::new("!");
    config.triggers = vec![
        ReactionTrigger {
            keyword: "cat".into(),
            emoji: "🐱".into(),
        },
        ReactionTrigger {
            keyword: "dog".into(),
            emoji: "🐶".into(),
        },
    ];
    let h = Harness::new(config, vec![]).await?;

    assert_eq!(h.text("u", Some("g"), "I love CATS").await?, DispatchOutcome::Ignored);
    assert_eq!(h.platform.reactions(), vec!["🐱"]);
    Ok(())
}

#[tokio::test]
async fn help_lists_and_describes_commands() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let ping = counting(&["ping"], &runs).category("fun").build()?;
    let mut config = HandlerConfig::new("!");
    config.help = Some(HelpSettings {
        names: vec!["help".into(), "h".into()],
        title: Some("Bot help".into()),
        categories: true,
    });
    let h = Harness::new(config, vec![ping]).await?;

    assert_eq!(h.text("u", Some("g"), "!h").await?, DispatchOutcome::Executed { success: true });
    assert_eq!(h.platform.texts(), vec!["**Bot help**\n\n*Fun*\n**Ping** - test command"]);

    h.platform.clear();
    h.text("u", Some("g"), "!help ping").await?;
    assert_eq!(h.platform.texts(), vec!["**ping**\ntest command\nCategory: fun"]);

    h.platform.clear();
    h.text("u", Some("g"), "!help nope").await?;
    assert!(h.platform.texts().is_empty());
    Ok(())
}

#[tokio::test]
async fn deferred_ephemeral_interaction_flow() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let slow = counting(&["slow"], &runs).deferred(true).ephemeral(true).build()?;
    let mut config = HandlerConfig::new("!");
    config.admins = vec!["boss".into()];
    let secret = counting(&["secret"], &runs).admin_only(true).build()?;
    let h = Harness::new(config, vec![slow, secret]).await?;

    assert_eq!(h.slash("u", Some("g"), "slow").await?, DispatchOutcome::Executed { success: true });
    assert_eq!(
        h.platform.calls(),
        vec![
            PlatformCall::Defer {
                interaction_id: "i1".into(),
                ephemeral: true,
            },
            PlatformCall::EditResponse {
                interaction_id: "i1".into(),
                content: "pong".into(),
            },
        ]
    );

    h.platform.clear();
    assert_eq!(h.slash("u", Some("g"), "secret").await?, DispatchOutcome::Denied(DenyReason::NoAdmin));
    assert_eq!(
        h.platform.calls(),
        vec![PlatformCall::Respond {
            interaction_id: "i1".into(),
            content: "You can't run this command!".into(),
            ephemeral: true,
        }]
    );
    Ok(())
}

#[tokio::test]
async fn load_publishes_only_when_declarations_change() -> Result<(), Error> {
    let platform = Arc::new(RecordingPlatform::new());
    let store = Arc::new(CooldownStore::new(
        Arc::new(InMemoryCooldownRepository::new()),
        Arc::new(ManualClock::new(START)),
    ));
    let mut config = HandlerConfig::new("!");
    config.test_guilds = vec!["lab".into()];
    let dispatcher = Dispatcher::new(config, platform.clone(), store);

    let commands = || -> Result<Vec<CommandEntry>, Error> {
        let runs = Arc::new(AtomicUsize::new(0));
        Ok(vec![
            counting(&["ping"], &runs).build()?.into(),
            counting(&["debug"], &runs).test_only(true).build()?.into(),
            counting(&["legacy"], &runs).no_interaction(true).build()?.into(),
        ])
    };

    let summary = dispatcher.load(commands()?).await?;
    assert_eq!(summary.commands, 3);
    assert_eq!(summary.global_declarations, 1);
    assert_eq!(summary.test_guild_declarations, 1);
    assert_eq!(summary.published_scopes, 2);
    assert_eq!(platform.published(&PublishScope::Global)[0].name, "ping");
    assert_eq!(platform.published(&PublishScope::Guild("lab".into()))[0].name, "debug");

    platform.clear();
    let summary = dispatcher.load(commands()?).await?;
    assert_eq!(summary.published_scopes, 0);
    assert_eq!(platform.publish_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn load_rejects_bad_definitions_and_keeps_previous_set() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let platform = Arc::new(RecordingPlatform::new());
    let store = Arc::new(CooldownStore::new(
        Arc::new(InMemoryCooldownRepository::new()),
        Arc::new(ManualClock::new(START)),
    ));
    let dispatcher = Dispatcher::new(HandlerConfig::new("!"), platform.clone(), store);
    dispatcher.load(vec![counting(&["ping"], &runs).build()?.into()]).await?;

    let undocumented = Command::builder(["quiet"])
        .run(|_ctx| async { Ok(CommandOutcome::Success) })
        .build()?;
    let err = dispatcher.load(vec![undocumented.into()]).await.unwrap_err();
    assert!(err.is_config_error());

    let dupes = vec![
        counting(&["a", "shared"], &runs).build()?.into(),
        counting(&["b", "Shared"], &runs).build()?.into(),
    ];
    let err = dispatcher.load(dupes).await.unwrap_err();
    assert!(matches!(err, Error::DuplicateName(ref n) if n == "shared"));

    let lonely_admin = vec![counting(&["ban"], &runs).admin_only(true).build()?.into()];
    assert!(dispatcher.load(lonely_admin).await.unwrap_err().is_config_error());

    assert!(dispatcher.registry().lookup("ping").is_some());
    Ok(())
}

#[tokio::test]
async fn publish_failures_do_not_abort_loading() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let platform = Arc::new(RecordingPlatform::new());
    platform.fail_publishing(true);
    let store = Arc::new(CooldownStore::new(
        Arc::new(InMemoryCooldownRepository::new()),
        Arc::new(ManualClock::new(START)),
    ));
    let dispatcher = Dispatcher::new(HandlerConfig::new("!"), platform.clone(), store);

    let summary = dispatcher.load(vec![counting(&["ping"], &runs).build()?.into()]).await?;
    assert_eq!(summary.published_scopes, 0);
    assert_eq!(platform.publish_calls(), 1);
    assert!(dispatcher.registry().lookup("ping").is_some());
    Ok(())
}

#[tokio::test]
async fn listen_subscribes_once() -> Result<(), Error> {
    let runs = Arc::new(AtomicUsize::new(0));
    let ping = counting(&["ping"], &runs).build()?;
    let h = Harness::new(HandlerConfig::new("!"), vec![ping]).await?;
    assert_eq!(h.dispatcher.state(), DispatcherState::Loading);

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let (_tx2, rx2) = tokio::sync::mpsc::unbounded_channel();
    let listener = h.dispatcher.listen(rx).expect("first listen subscribes");
    assert!(h.dispatcher.listen(rx2).is_none());
    assert_eq!(h.dispatcher.state(), DispatcherState::Listening);

    // Reloading while listening keeps the subscription.
    h.dispatcher
        .load(vec![counting(&["ping"], &runs).build()?.into()])
        .await?;
    assert_eq!(h.dispatcher.state(), DispatcherState::Listening);

    tx.send(InboundEvent::Message(text_message("m9", "u", Some("g"), "!ping")))
        .expect("listener alive");
    for _ in 0..100 {
        if runs.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    drop(tx);
    listener.await.expect("listener exits when the stream closes");
    Ok(())
}

//! 直播模拟演示
//!
//! 展示如何驱动一场完整的模拟直播：按键步进评论、开关贴纸与商品卡、
//! 观众数随机游走，全部通过事件流观察。

use liveshow_sdk::{
    toggle_names, EventFilter, FocusRole, LiveEvent, LiveShowConfig, LiveShowSession, SDK_VERSION,
};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("\n🎬 直播带货模拟演示 (SDK v{})\n", SDK_VERSION);
    println!("====================================\n");

    // 配置会话：固定种子，观众数轨迹可复现
    let config = LiveShowConfig::builder().rng_seed(42).build();

    println!("📦 正在初始化会话...");
    let session = LiveShowSession::initialize(config).await?;
    println!("✅ 会话初始化完成\n");

    // 打印初始快照
    let snapshot = session.snapshot();
    println!("【开播状态】");
    println!("   主播: {}", snapshot.host_username);
    println!("   观众: {}", snapshot.viewer_count_display);
    println!("   脚本: {} 条评论", session.script().comment_count());
    if let Some(product) = &snapshot.product {
        println!("   商品: {} ¥{}", product.name, product.price);
    }
    println!();

    // 只看评论事件的过滤订阅
    let filter = EventFilter::new().with_event_types(vec!["comment_appended".to_string()]);
    let mut comments = session.subscribe_filtered(filter);

    // 空格键手动步进三条评论
    println!("⌨️  手动步进评论...");
    for _ in 0..3 {
        session.handle_key("Space", FocusRole::None);
        if let Ok(LiveEvent::CommentAppended { record, cursor, .. }) = comments.recv().await {
            println!("   [{}] {}: {}", cursor, record.username, record.text);
        }
        sleep(Duration::from_millis(300)).await;
    }
    println!();

    // 开关演示
    println!("🎛️  开关演示...");
    session.handle_key("h", FocusRole::None);
    if let Some(visible) = session.toggles().get_bool(toggle_names::STICKER_VISIBLE) {
        println!("   贴纸可见: {}", visible);
    }
    session.handle_key("4", FocusRole::None);
    if let Some(sticker) = session.toggles().get_choice(toggle_names::STICKER) {
        println!("   当前贴纸: {}", sticker);
    }
    session.handle_key("]", FocusRole::None);
    println!("   观众数 +10: {}", session.viewer().count());
    println!();

    // 焦点在输入框时按键不触发命令
    let suppressed = session.handle_key("Space", FocusRole::TextInput);
    println!("🔇 输入框聚焦时 Space: {:?}\n", suppressed);

    // 自动播放剩余脚本
    println!("▶️  开启自动播放，跑完剩余脚本...");
    session.handle_key("a", FocusRole::None);
    while let Ok(LiveEvent::CommentAppended { record, .. }) = comments.recv().await {
        println!("   {}: {}", record.username, record.text);
        if session.scheduler().is_exhausted() {
            break;
        }
    }
    println!("🏁 脚本播完，自动播放已熄灭\n");

    // 收播
    let snapshot = session.snapshot();
    println!("【收播状态】");
    println!("   可见评论: {} 条", snapshot.visible_comments.len());
    println!("   观众峰值参考: {}", snapshot.viewer_count_display);

    let stats = session.event_manager().get_stats();
    println!("   事件总数: {}", stats.total_events);

    session.shutdown().await?;
    println!("\n👋 演示结束");
    Ok(())
}

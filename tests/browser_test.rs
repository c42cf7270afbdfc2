use std::time::Duration;

use quiz_chain_solver::browser::launch_headless_browser;
use quiz_chain_solver::infrastructure::{ChromiumRenderer, PageRenderer};

#[tokio::test]
#[ignore] // 需要本机安装 Chrome/Chromium：cargo test -- --ignored
async fn test_render_script_generated_question() {
    let browser = launch_headless_browser(std::env::var("CHROME_EXECUTABLE").ok().as_deref())
        .await
        .expect("启动浏览器失败");
    let renderer = ChromiumRenderer::new(browser, 1, Duration::from_millis(500));

    let html = "<html><body><div id='q'></div><script>\
                document.getElementById('q').innerText = atob('V2hhdCBpcyAyKzI/');\
                </script></body></html>";
    let url = format!("data:text/html,{}", html.replace(' ', "%20").replace('#', "%23"));

    let page = renderer
        .render(&url, Duration::from_secs(20))
        .await
        .expect("渲染失败");

    assert!(page.text.contains("What is 2+2?"), "可见文字: {}", page.text);
}

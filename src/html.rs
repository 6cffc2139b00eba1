use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::builtin;
use crate::config::SiteConfig;
use crate::normalize::NormalizedPost;
use crate::pagination::PaginationState;
use crate::reading_time::reading_time;
use crate::richtext;

pub const LOAD_MORE_LABEL: &str = "Carregar mais posts";
pub const LOADING_LABEL: &str = "Carregando...";

/// How the "load more" affordance reaches the next page.
#[derive(Debug, Clone)]
pub enum LoadMore {
    /// Server mode: POST to the session's load endpoint.
    Form { action: String },
    /// Static export: link to the next pre-rendered listing file.
    Link { href: String },
}

/// Message shown above the listing after a load did not go through.
#[derive(Debug, Clone)]
pub enum Notice {
    Busy,
    Failed(String),
}

/// Where post links on the listing point.
#[derive(Debug, Clone, Copy)]
pub enum PostLinks {
    /// `/post/{uid}` on the server.
    Route,
    /// `post/{uid}.html` next to the exported listing.
    Exported,
}

impl PostLinks {
    fn href(self, uid: &str) -> String {
        match self {
            PostLinks::Route => format!("/post/{uid}"),
            PostLinks::Exported => format!("post/{uid}.html"),
        }
    }
}

pub struct ListingView<'a> {
    pub state: &'a PaginationState,
    pub load_more: LoadMore,
    pub links: PostLinks,
    pub notice: Option<Notice>,
}

/// Renders the accumulated listing in order. The load-more affordance appears
/// only while the state still has a cursor.
pub fn render_listing(config: &SiteConfig, view: &ListingView<'_>) -> String {
    let title = format!("Início | {}", config.site_name);
    let body = html! {
        main class="container" {
            div class="posts" {
                @for post in &view.state.posts {
                    a class="post-card" href=(view.links.href(&post.uid)) {
                        strong { (post.data.title) }
                        p { (post.data.subtitle) }
                        div class="infos" {
                            @if let Some(date) = &post.first_publication_date {
                                div { span class="icon" { "📅" } time { (date) } }
                            }
                            div { span class="icon" { "👤" } span { (post.data.author) } }
                        }
                    }
                }

                @match &view.notice {
                    Some(Notice::Busy) => {
                        p class="notice" role="status" { "Os posts já estão sendo carregados." }
                    },
                    Some(Notice::Failed(message)) => {
                        p class="notice notice-error" role="alert" {
                            "Não foi possível carregar mais posts. Tente novamente."
                            br;
                            small { (message) }
                        }
                    },
                    None => {},
                }

                @if view.state.has_more() {
                    @match &view.load_more {
                        LoadMore::Form { action } => {
                            form method="post" action=(action) {
                                button type="submit" class="load-more" { (LOAD_MORE_LABEL) }
                            }
                        },
                        LoadMore::Link { href } => {
                            a class="load-more" href=(href) { (LOAD_MORE_LABEL) }
                        },
                    }
                }
            }
        }
    };
    page(config, &title, None, body)
}

/// Renders a post with its reading time. `home_href` is the header logo target.
pub fn render_detail(config: &SiteConfig, post: &NormalizedPost, home_href: &str) -> String {
    let title = format!("{} | {}", post.data.title, config.site_name);
    let content = post.data.content.as_deref().unwrap_or_default();
    let minutes = reading_time(content);

    let body = html! {
        @if let Some(banner) = &post.data.banner {
            @let alt = banner.alt.as_deref().unwrap_or(&post.data.title);
            img class="banner" src=(banner.url) alt=(alt);
        }
        article class="container post" {
            div class="title-container" {
                h1 { (post.data.title) }
                div class="infos" {
                    @if let Some(date) = &post.first_publication_date {
                        div { span class="icon" { "📅" } time { (date) } }
                    }
                    div { span class="icon" { "👤" } span { (post.data.author) } }
                    div {
                        span class="icon" { "🕒" }
                        span class="reading-time" { (minutes) " min" }
                    }
                }
            }
            @for block in content {
                section class="content" {
                    h2 { (block.heading) }
                    (richtext::render_runs(&block.body))
                }
            }
        }
    };
    page(config, &title, Some(home_href), body)
}

/// Interim page while a post is generated. Reloads itself until it is ready.
pub fn render_loading(config: &SiteConfig) -> String {
    let body = html! {
        main class="container" {
            div class="loading" { (LOADING_LABEL) }
        }
    };
    let refresh = html! { meta http-equiv="refresh" content="1"; };
    page_with_head(config, &config.site_name, None, Some(refresh), body)
}

pub fn render_not_found(config: &SiteConfig, uid: &str) -> String {
    let body = html! {
        main class="container" {
            div class="message" {
                h1 { "Post não encontrado" }
                p { "Nenhum post com o identificador " code { (uid) } "." }
                a href="/" { "Voltar para o início" }
            }
        }
    };
    page(config, &format!("Não encontrado | {}", config.site_name), None, body)
}

pub fn render_error(config: &SiteConfig, message: &str) -> String {
    let body = html! {
        main class="container" {
            div class="message" {
                h1 { "Algo deu errado" }
                p { "O conteúdo não pôde ser carregado agora. Tente novamente em instantes." }
                p { small { (message) } }
                a href="/" { "Voltar para o início" }
            }
        }
    };
    page(config, &format!("Erro | {}", config.site_name), None, body)
}

fn page(config: &SiteConfig, title: &str, home_href: Option<&str>, body: Markup) -> String {
    page_with_head(config, title, home_href, None, body)
}

fn page_with_head(
    config: &SiteConfig,
    title: &str,
    home_href: Option<&str>,
    extra_head: Option<Markup>,
    body: Markup,
) -> String {
    let markup: Markup = html! {
        (DOCTYPE)
        html lang="pt-BR" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                @if let Some(extra) = extra_head {
                    (extra)
                }
                title { (title) }
                style { (PreEscaped(builtin::BUILTIN_CSS)) }
            }
            body {
                header class="site-header" {
                    div class="container" {
                        a class="logo" href=(home_href.unwrap_or("/")) {
                            (config.site_name) span class="dot" { "." }
                        }
                    }
                }
                (body)
            }
        }
    };
    markup.into_string()
}

use axum::http::StatusCode;
use maud::{DOCTYPE, Markup, html};

use crate::{
    category::Category,
    entities::{movie, user},
    forms::FieldErrors,
    tmdb::SearchResult,
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

/// Per-request chrome: who is logged in and which flash messages to show.
pub struct PageContext<'a> {
    pub user: Option<&'a user::Model>,
    pub flashes: &'a [String],
}

pub fn home_page(ctx: &PageContext) -> String {
    page(
        "Seasonal Films",
        ctx,
        None,
        html! {
            div class="bg-white shadow rounded-lg p-8 text-center" {
                h1 class="text-3xl font-bold text-gray-900" { "Seasonal Films" }
                p class="mt-2 text-gray-600" { "A film for every season. Let us pick one for tonight." }
                div class="mt-8 flex justify-center gap-4" {
                    a class=(BUTTON) href="/search" { "Surprise me" }
                    a class=(LINK) href="/films" { "Browse all films" }
                }
            }
        },
    )
}

pub fn films_page(ctx: &PageContext, movies: &[movie::Model]) -> String {
    page(
        "All films",
        ctx,
        None,
        html! {
            div class="flex items-start justify-between gap-6" {
                h1 class="text-3xl font-bold text-gray-900" { "All films" }
                a class=(LINK) href="/add" { "Add a film" }
            }
            @if movies.is_empty() {
                div class="mt-10 bg-white shadow rounded-lg p-8" {
                    p class="text-gray-600" { "No films yet." }
                }
            } @else {
                div class="mt-10 space-y-4" {
                    @for movie in movies {
                        (movie_card(movie, true))
                    }
                }
            }
        },
    )
}

pub fn add_page(ctx: &PageContext, title: &str, errors: &FieldErrors) -> String {
    page(
        "Add a film",
        ctx,
        None,
        html! {
            div class="bg-white shadow rounded-lg p-8" {
                h1 class="text-2xl font-bold text-gray-900" { "Add a film" }
                form class="mt-8 space-y-6" method="post" action="/add" {
                    div {
                        label class=(LABEL) for="title" { "Search for a film by entering its title below:" }
                        input class=(INPUT) name="title" id="title" value=(title) required;
                        (field_error(errors, "title"))
                    }
                    button class=(BUTTON) type="submit" { "Search for Film" }
                }
            }
        },
    )
}

pub fn select_page(ctx: &PageContext, results: &[SearchResult], image_base: &str) -> String {
    page(
        "Select a film",
        ctx,
        None,
        html! {
            h1 class="text-3xl font-bold text-gray-900" { "Select a film" }
            @if results.is_empty() {
                div class="mt-10 bg-white shadow rounded-lg p-8" {
                    p class="text-gray-600" { "Nothing matched that title." }
                    a class=(LINK) href="/add" { "Try another search" }
                }
            } @else {
                ul class="mt-10 space-y-2" {
                    @for result in results {
                        li class="bg-white shadow rounded-lg p-4 flex gap-4" {
                            @if let Some(poster) = &result.poster_path {
                                img class="w-16 rounded" src=(format!("{}/{}", image_base.trim_end_matches('/'), poster.trim_start_matches('/'))) alt=(result.title);
                            }
                            div {
                                a class=(LINK) href=(format!("/select?id={}", result.id)) {
                                    (result.title)
                                    @if let Some(date) = result.release_date.as_deref().filter(|d| !d.is_empty()) {
                                        span class="ml-2 text-gray-500" { " - " (date) }
                                    }
                                }
                                @if let Some(overview) = &result.overview {
                                    p class="mt-1 text-sm text-gray-600" { (overview) }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn edit_page(
    ctx: &PageContext,
    movie: &movie::Model,
    selected: Category,
    errors: &FieldErrors,
) -> String {
    page(
        &format!("Edit {}", movie.title),
        ctx,
        None,
        html! {
            div class="bg-white shadow rounded-lg p-8" {
                h1 class="text-2xl font-bold text-gray-900" { (movie.title) }
                p class="mt-1 text-gray-500" { (movie.year) }
                form class="mt-8 space-y-6" method="post" action=(format!("/edit?id={}", movie.id)) {
                    fieldset {
                        legend class=(LABEL) { "Which of the below categories does this film belong to?" }
                        @for category in Category::all() {
                            label class="mt-2 flex items-center gap-2 text-gray-700" {
                                input type="radio" name="category" value=(category.as_str()) checked[category == selected];
                                (category.as_str())
                            }
                        }
                        (field_error(errors, "category"))
                    }
                    button class=(BUTTON) type="submit" { "Save film details" }
                }
            }
        },
    )
}

pub fn search_page(ctx: &PageContext, selected: Category, errors: &FieldErrors) -> String {
    page(
        "Pick a category",
        ctx,
        None,
        html! {
            div class="bg-white shadow rounded-lg p-8" {
                h1 class="text-2xl font-bold text-gray-900" { "Pick a category" }
                form class="mt-8 space-y-6" method="post" action="/search" {
                    div {
                        label class=(LABEL) for="category" { "Which category would you like??" }
                        select class=(INPUT) name="category" id="category" {
                            @for category in Category::all() {
                                option value=(category.as_str()) selected[category == selected] { (category.as_str()) }
                            }
                        }
                        (field_error(errors, "category"))
                    }
                    button class=(BUTTON) type="submit" { "Choose my film" }
                }
            }
        },
    )
}

pub fn result_page(ctx: &PageContext, movies: &[movie::Model], background: Option<&str>) -> String {
    page(
        "Your films",
        ctx,
        background,
        html! {
            h1 class="text-3xl font-bold text-gray-900" { "Tonight's picks" }
            @if movies.is_empty() {
                div class="mt-10 bg-white shadow rounded-lg p-8" {
                    p class="text-gray-600" { "No films in that category yet." }
                }
            } @else {
                div class="mt-10 space-y-4" {
                    @for movie in movies {
                        (movie_card(movie, false))
                    }
                }
            }
            a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/search" { "Pick again" }
        },
    )
}

pub fn register_page(ctx: &PageContext, email: &str, name: &str, errors: &FieldErrors) -> String {
    page(
        "Register",
        ctx,
        None,
        html! {
            div class="bg-white shadow rounded-lg p-8" {
                h1 class="text-2xl font-bold text-gray-900" { "Register" }
                form class="mt-8 space-y-6" method="post" action="/register" {
                    div {
                        label class=(LABEL) for="email" { "Email" }
                        input class=(INPUT) type="email" name="email" id="email" value=(email) required;
                        (field_error(errors, "email"))
                    }
                    div {
                        label class=(LABEL) for="password" { "Password" }
                        input class=(INPUT) type="password" name="password" id="password" required;
                        (field_error(errors, "password"))
                    }
                    div {
                        label class=(LABEL) for="name" { "Name" }
                        input class=(INPUT) name="name" id="name" value=(name) required;
                        (field_error(errors, "name"))
                    }
                    button class=(BUTTON) type="submit" { "Sign me up!" }
                }
            }
        },
    )
}

pub fn login_page(ctx: &PageContext, email: &str, errors: &FieldErrors) -> String {
    page(
        "Log in",
        ctx,
        None,
        html! {
            div class="bg-white shadow rounded-lg p-8" {
                h1 class="text-2xl font-bold text-gray-900" { "Log in" }
                form class="mt-8 space-y-6" method="post" action="/login" {
                    div {
                        label class=(LABEL) for="email" { "Email" }
                        input class=(INPUT) type="email" name="email" id="email" value=(email) required;
                        (field_error(errors, "email"))
                    }
                    div {
                        label class=(LABEL) for="password" { "Password" }
                        input class=(INPUT) type="password" name="password" id="password" required;
                        (field_error(errors, "password"))
                    }
                    button class=(BUTTON) type="submit" { "Let me in." }
                }
            }
        },
    )
}

pub fn error_page(status: StatusCode, message: String) -> String {
    let ctx = PageContext { user: None, flashes: &[] };
    page(
        "Error",
        &ctx,
        None,
        html! {
            div class="bg-white shadow rounded-lg p-8" {
                h1 class="text-2xl font-bold text-gray-900" { (status) }
                p class="mt-4 text-gray-700" { (message) }
                a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/" { "Back" }
            }
        },
    )
}

const BUTTON: &str = "rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700";
const LINK: &str = "text-blue-600 hover:text-blue-800";
const LABEL: &str = "block text-sm font-medium text-gray-700";
const INPUT: &str = "mt-2 w-full rounded-md border border-gray-300 px-3 py-2 focus:border-blue-500 focus:outline-none focus:ring-1 focus:ring-blue-500";

fn page(title: &str, ctx: &PageContext, background: Option<&str>, body: Markup) -> String {
    let style = background.map(|bg| format!("background-image: url('{bg}'); background-size: cover;"));

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                script src=(TAILWIND_CDN) {}
            }
            body class="min-h-screen bg-gray-50" style=[style] {
                (nav(ctx.user))
                div class="max-w-3xl mx-auto px-6 py-10" {
                    @for message in ctx.flashes {
                        div class="mb-4 rounded-md bg-yellow-50 border border-yellow-300 px-4 py-2 text-yellow-800" { (message) }
                    }
                    (body)
                }
            }
        }
    }
    .into_string()
}

fn nav(user: Option<&user::Model>) -> Markup {
    html! {
        nav class="bg-white shadow" {
            div class="max-w-3xl mx-auto px-6 py-3 flex gap-6 text-sm" {
                a class=(LINK) href="/" { "Home" }
                a class=(LINK) href="/films" { "Films" }
                a class=(LINK) href="/search" { "Surprise me" }
                span class="flex-1" {}
                @match user {
                    Some(user) => {
                        span class="text-gray-500" { (user.name) }
                        a class=(LINK) href="/add" { "Add film" }
                        a class=(LINK) href="/logout" { "Log out" }
                    },
                    None => {
                        a class=(LINK) href="/login" { "Log in" }
                        a class=(LINK) href="/register" { "Register" }
                    },
                }
            }
        }
    }
}

fn field_error(errors: &FieldErrors, field: &str) -> Markup {
    html! {
        @if let Some(message) = errors.get(field) {
            p class="mt-2 text-sm text-red-600" { (message) }
        }
    }
}

fn movie_card(movie: &movie::Model, manage: bool) -> Markup {
    html! {
        div class="bg-white shadow rounded-lg p-6 flex gap-6" {
            @if !movie.image_url.is_empty() {
                img class="w-24 rounded" src=(movie.image_url) alt=(movie.title);
            }
            div class="flex-1" {
                h2 class="text-xl font-semibold text-gray-900" {
                    (movie.title)
                    span class="ml-2 font-normal text-gray-500" { "(" (movie.year) ")" }
                }
                p class="mt-1 text-sm text-gray-500" {
                    @match movie.category {
                        Some(category) => (category.as_str()),
                        None => "Uncategorised",
                    }
                }
                p class="mt-3 text-gray-700" { (movie.description) }
                @if manage {
                    div class="mt-4 flex gap-4 text-sm" {
                        a class=(LINK) href=(format!("/edit?id={}", movie.id)) { "Update" }
                        a class="text-red-600 hover:text-red-800" href=(format!("/delete?id={}", movie.id)) { "Delete" }
                    }
                }
            }
        }
    }
}

use crate::data::{
    leave_request::{LeaveType, RequestStatus},
    user::User,
};
use maud::{Markup, Render, html};

pub fn render_table<const N: usize>(
    overall_title: impl Render,
    titles: [&'static str; N],
    items: Vec<[Markup; N]>,
) -> Markup {
    html! {
        div class="container mx-auto" {
            (title(overall_title))
            div class="overflow-x-auto" {
                table class="min-w-full bg-gray-800 rounded shadow-md" {
                    thead class="bg-gray-700" {
                        tr {
                            @for title in titles {
                                th class="py-2 px-4 text-left font-semibold text-gray-300" {(title)}
                            }
                        }
                    }
                    tbody {
                        @if items.is_empty() {
                            tr {
                                td colspan=(N) class="py-6 px-4 text-center italic text-gray-400" {"Nothing here yet."}
                            }
                        }
                        @for row in items {
                            tr {
                                @for col in row {
                                    td class="py-2 px-4 border-b border-gray-600 text-gray-200" {(col)}
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn title(s: impl Render) -> Markup {
    html! {
        h1 class="text-2xl font-semibold mb-4" {(s)}
    }
}

pub fn subtitle(s: impl Render) -> Markup {
    html! {
        h2 class="text-xl font-semibold mb-2 text-gray-300" {(s)}
    }
}

pub fn form_element(id: &'static str, label: &'static str, element: Markup) -> Markup {
    html! {
        div class="mb-4" {
            label for=(id) class="block text-sm font-bold mb-2 text-gray-300" {(label)}
            (element)
        }
    }
}

pub fn simple_form_element(
    id: &'static str,
    label: &'static str,
    required: bool,
    input_type: Option<&'static str>,
    value: Option<&str>,
) -> Markup {
    form_element(
        id,
        label,
        html! {
            input required[required] type=(input_type.unwrap_or("text")) id=(id) name=(id) value=[value] class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600" {}
        },
    )
}

pub fn select_element<'a>(
    id: &'static str,
    label: &'static str,
    options: impl IntoIterator<Item = (&'a str, &'a str)>,
    selected: &str,
) -> Markup {
    form_element(
        id,
        label,
        html! {
            select id=(id) name=(id) class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600" {
                @for (value, text) in options {
                    option value=(value) selected[value == selected] {(text)}
                }
            }
        },
    )
}

pub fn form_submit_button(text: Option<&str>) -> Markup {
    html! {
        div class="flex items-center justify-between" {
            button type="submit" class="bg-blue-500 hover:bg-blue-700 font-bold py-2 px-4 rounded focus:outline-none focus:shadow-outline" {
                (text.unwrap_or("Submit"))
            }
        }
    }
}

pub fn errors_list<'a>(errors: impl IntoIterator<Item = &'a str>) -> Markup {
    html! {
        div role="alert" class="bg-red-100 border border-red-400 text-red-700 px-4 py-4 rounded relative mb-4" {
            strong class="font-bold" {"Alert!"}
            ul class="list-disc list-inside" {
                @for error in errors {
                    li {(error)}
                }
            }
        }
    }
}

pub fn status_badge(status: RequestStatus) -> Markup {
    let colours = match status {
        RequestStatus::Pending => "bg-yellow-200 text-yellow-900",
        RequestStatus::Approved => "bg-green-200 text-green-900",
        RequestStatus::Rejected => "bg-red-200 text-red-900",
        RequestStatus::Exited => "bg-blue-200 text-blue-900",
        RequestStatus::Returned => "bg-gray-300 text-gray-900",
    };

    html! {
        span class={"px-2 py-1 rounded-full text-xs font-bold " (colours)} {(status)}
    }
}

pub fn leave_type_badge(leave_type: LeaveType) -> Markup {
    html! {
        @match leave_type {
            LeaveType::Emergency => {
                span class="px-2 py-1 rounded text-xs font-bold bg-red-600 text-white" {(leave_type)}
            }
            LeaveType::Normal => {
                span class="px-2 py-1 rounded text-xs text-gray-300" {(leave_type)}
            }
        }
    }
}

pub fn stat_card(label: &'static str, value: usize, colour: &'static str) -> Markup {
    html! {
        div class={"rounded shadow-md p-4 text-center " (colour)} {
            p class="text-sm uppercase tracking-wide" {(label)}
            p class="text-3xl font-bold" {(value)}
        }
    }
}

pub fn action_button(
    url: &str,
    text: &'static str,
    colour: &'static str,
    confirm: Option<&str>,
) -> Markup {
    html! {
        button hx-post=(url) hx-target="#flash" hx-confirm=[confirm] class={"font-bold py-1 px-3 rounded text-sm " (colour)} {
            (text)
        }
    }
}

pub fn render_nav(user: Option<&User>) -> Markup {
    html! {
        nav class="bg-gray-800 p-4 w-full fixed top-0 left-0 z-10" {
            div class="container mx-auto flex items-center justify-between" {
                a href="/" class="text-white font-bold text-xl" {"SecureLeave"}
                div class="flex items-center space-x-4" {
                    @if let Some(user) = user {
                        a href="/dashboard" class="hover:bg-gray-700 px-3 py-2 rounded" {"Dashboard"}
                        @if user.get_permissions().contains(crate::auth::PermissionsTarget::MANAGE_DEVICES) {
                            a href="/devices" class="hover:bg-gray-700 px-3 py-2 rounded" {"Security Audit"}
                        }
                        img src=(user.avatar) alt="" class="w-8 h-8 rounded-full bg-gray-600" {}
                        span class="text-gray-300" {(user) " (" (user.role) ")"}
                        form method="post" action="/logout" {
                            button type="submit" class="bg-red-600 hover:bg-red-800 font-bold py-2 px-3 rounded" {"Logout"}
                        }
                    } @else {
                        a href="/s" class="hover:bg-gray-700 px-3 py-2 rounded" {"Student Portal"}
                        a href="/" class="hover:bg-gray-700 px-3 py-2 rounded" {"Staff Login"}
                    }
                }
            }
        }
    }
}

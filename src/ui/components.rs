/// Reusable UI components

use patternfly_yew::prelude::*;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::host_data::HostConfig;
use crate::ui::popup::Edit;

#[derive(Properties, PartialEq)]
pub struct HostCardProps {
    pub host: HostConfig,
    pub on_edit: Callback<Edit>,
    #[prop_or(false)]
    pub disabled: bool,
}

/// One configured hostname: toggles, title editor, remove button
#[function_component(HostCard)]
pub fn host_card(props: &HostCardProps) -> Html {
    let host = &props.host;
    let title_input = use_state(|| host.user_title.clone());

    let on_title_input = {
        let title_input = title_input.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                title_input.set(input.value());
            }
        })
    };

    let host_name = host.host_name.clone();
    let on_toggle_state = props
        .on_edit
        .reform(move |_: Event| Edit::ToggleHost(host_name.clone()));

    let host_name = host.host_name.clone();
    let on_toggle_appended = props
        .on_edit
        .reform(move |_: Event| Edit::ToggleAppended(host_name.clone()));

    let on_save_title = {
        let host_name = host.host_name.clone();
        let title_input = title_input.clone();
        props.on_edit.reform(move |_: MouseEvent| {
            Edit::SetUserTitle(host_name.clone(), (*title_input).clone())
        })
    };

    let host_name = host.host_name.clone();
    let on_remove = props
        .on_edit
        .reform(move |_: MouseEvent| Edit::RemoveHost(host_name.clone()));

    let title_changed = *title_input != host.user_title;

    html! {
        <div class="host-card">
            <div class="host-header">
                <label class="host-name">
                    <input
                        type="checkbox"
                        checked={host.host_state}
                        disabled={props.disabled}
                        onchange={on_toggle_state}
                    />
                    {&host.host_name}
                </label>
                <Button
                    onclick={on_remove}
                    disabled={props.disabled}
                    variant={ButtonVariant::Danger}
                >
                    {"✗"}
                </Button>
            </div>

            <div class="host-title-edit">
                <input
                    type="text"
                    value={(*title_input).clone()}
                    oninput={on_title_input}
                    class="host-title-input"
                />
                <Button
                    onclick={on_save_title}
                    disabled={props.disabled || !title_changed}
                >
                    {"✓"}
                </Button>
            </div>

            <label class="host-mode">
                <input
                    type="checkbox"
                    checked={host.is_appended}
                    disabled={props.disabled}
                    onchange={on_toggle_appended}
                />
                {if host.is_appended { "Append to page title" } else { "Replace page title" }}
            </label>

            <p class="host-tabs">
                {format!("{} tabs tracked", host.original_tab_titles.len())}
            </p>
        </div>
    }
}

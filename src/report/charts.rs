//! Chart generation for the reports page.
//!
//! Two ECharts visualizations mirror the report aggregations:
//! - **Daily movements**: a bar chart of net movement per day, green for
//!   positive days and red for negative ones.
//! - **Income vs expenses**: a pie chart splitting the range into Ingresos
//!   and Egresos.
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization
//! code.

use charming::{
    Chart,
    component::{Axis, Grid, Title, VisualMap, VisualMapPiece},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger,
    },
    series::{Bar, Pie},
};
use maud::{Markup, PreEscaped, html};

use crate::html::HeadElement;

use super::aggregation::{DailyMovement, IncomeExpenseSplit};

/// The colour for income values, as used across the report.
const INCOME_COLOR: &str = "#22c55e";
/// The colour for expense values.
const EXPENSE_COLOR: &str = "#ef4444";

/// A report chart with its HTML container ID and ECharts configuration.
pub(super) struct ReportChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for the report charts.
pub(super) fn charts_view(charts: &[ReportChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for the report charts.
pub(super) fn charts_script(charts: &[ReportChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// The bar chart of net movement per day over the selected range.
pub(super) fn daily_movement_chart(movements: &[DailyMovement]) -> Chart {
    let labels: Vec<String> = movements
        .iter()
        .map(|movement| format_fecha_label(movement.fecha))
        .collect();
    let values: Vec<f64> = movements.iter().map(|movement| movement.total).collect();

    Chart::new()
        .title(
            Title::new()
                .text("Movimiento Diario")
                .subtext("Net movement per day"),
        )
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .visual_map(VisualMap::new().show(false).pieces(vec![
            VisualMapPiece::new().lt(0).color(EXPENSE_COLOR),
            VisualMapPiece::new().gte(0).color(INCOME_COLOR),
        ]))
        .series(Bar::new().name("Movimiento Total").data(values))
}

/// The pie chart splitting the range into income and expenses.
pub(super) fn income_expense_chart(split: &IncomeExpenseSplit) -> Chart {
    Chart::new()
        .title(
            Title::new()
                .text("Ingresos vs Egresos")
                .subtext("Selected range"),
        )
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .color(vec![INCOME_COLOR, EXPENSE_COLOR])
        .series(Pie::new().name("Total").radius("55%").data(vec![
            (split.income, "Ingresos"),
            (split.expenses, "Egresos"),
        ]))
}

/// Format a date as "dd/MM/yyyy" for chart labels and CSV rows.
pub(super) fn format_fecha_label(fecha: time::Date) -> String {
    format!(
        "{:02}/{:02}/{:04}",
        fecha.day(),
        u8::from(fecha.month()),
        fecha.year()
    )
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
